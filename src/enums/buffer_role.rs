//! # **Buffer Roles** - *What a buffer slot holds, and sets of roles*
//!
//! [`BufferRole`] names the role a buffer plays within an array node and is the
//! dispatch key of the copy engine. [`BufferSet`] selects several roles at once
//! so allocation and copying can be run phase by phase.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::{BitOr, BitOrAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferRole {
    Validity,
    Offset,
    LargeOffset,
    UnionTypes,
    Data,
    /// Child arrays are copied by recursion, not as buffers.
    Child,
    /// Dictionary arrays are copied by recursion, not as buffers.
    Dictionary,
}

impl BufferRole {
    /// The [`BufferSet`] bit covering this role.
    pub fn set(self) -> BufferSet {
        match self {
            BufferRole::Validity => BufferSet::VALIDITY,
            BufferRole::Offset | BufferRole::LargeOffset => BufferSet::OFFSET,
            BufferRole::UnionTypes => BufferSet::UNION_TYPE,
            BufferRole::Data => BufferSet::DATA,
            BufferRole::Child => BufferSet::CHILD,
            BufferRole::Dictionary => BufferSet::DICTIONARY,
        }
    }
}

impl Display for BufferRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            BufferRole::Validity => "validity",
            BufferRole::Offset => "offset",
            BufferRole::LargeOffset => "large offset",
            BufferRole::UnionTypes => "union type ids",
            BufferRole::Data => "data",
            BufferRole::Child => "child",
            BufferRole::Dictionary => "dictionary",
        };
        f.write_str(s)
    }
}

/// Bit set of buffer roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferSet(u8);

impl BufferSet {
    pub const NONE: BufferSet = BufferSet(0);
    pub const VALIDITY: BufferSet = BufferSet(1);
    /// Offsets of either width.
    pub const OFFSET: BufferSet = BufferSet(1 << 1);
    pub const UNION_TYPE: BufferSet = BufferSet(1 << 2);
    pub const DATA: BufferSet = BufferSet(1 << 3);
    pub const CHILD: BufferSet = BufferSet(1 << 4);
    pub const DICTIONARY: BufferSet = BufferSet(1 << 5);
    pub const ALL: BufferSet = BufferSet(0xff);

    #[inline]
    pub const fn contains(self, other: BufferSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// `self | other`, usable in constants.
    #[inline]
    pub const fn union(self, other: BufferSet) -> BufferSet {
        BufferSet(self.0 | other.0)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for BufferSet {
    type Output = BufferSet;

    #[inline]
    fn bitor(self, rhs: BufferSet) -> BufferSet {
        BufferSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for BufferSet {
    #[inline]
    fn bitor_assign(&mut self, rhs: BufferSet) {
        self.0 |= rhs.0;
    }
}
