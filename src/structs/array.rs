//! # **ArrayParts** - *An array node under construction*
//!
//! Destination side of a copy. [`ArrayParts::allocate_structure`] mirrors the
//! buffer-slot shape of a bound source with every slot empty and `offset = 0`;
//! buffers are then allocated role by role with [`ArrayParts::alloc_buffers`]
//! and filled by the copy engine, children and dictionary are attached, and
//! [`ArrayParts::into_owned`] turns the parts into an exported [`OwnedArray`].
//!
//! Dropping the parts at any point frees every buffer allocated so far and
//! releases every child already attached.

use tracing::trace;

use crate::enums::buffer_role::{BufferRole, BufferSet};
use crate::enums::error::{ArrowVecError, Result};
use crate::ffi::array::OwnedArray;
use crate::ffi::arrow_dtype::ArrowType;
use crate::ffi::layout::{BufferLayout, ElementSize};
use crate::structs::bitmask::{bytes_for_bits, count_unset};
use crate::structs::buffer::Buffer;
use crate::structs::vector::{ArrowVector, read_offset};

/// Buffer roles in allocation order.
pub(crate) const ROLES: [BufferRole; 5] = [
    BufferRole::Validity,
    BufferRole::Offset,
    BufferRole::LargeOffset,
    BufferRole::UnionTypes,
    BufferRole::Data,
];

#[derive(Debug)]
pub struct ArrayParts {
    pub length: usize,
    pub null_count: i64,
    layout: BufferLayout,
    has_validity_buffer: bool,
    buffers: Vec<Option<Buffer>>,
    children: Vec<OwnedArray>,
    dictionary: Option<OwnedArray>,
}

impl ArrayParts {
    /// Creates parts shaped like `src` for `length` elements, with no buffers yet.
    pub fn allocate_structure(src: &ArrowVector<'_>, length: usize) -> Self {
        let has_validity_buffer = src.has_validity_buffer();
        let layout = src.layout().clone();
        let n_slots = layout.n_buffers + has_validity_buffer as usize;
        Self {
            length,
            null_count: 0,
            layout,
            has_validity_buffer,
            buffers: vec![None; n_slots],
            children: Vec::new(),
            dictionary: None,
        }
    }

    #[inline]
    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    #[inline]
    pub fn has_validity_buffer(&self) -> bool {
        self.has_validity_buffer
    }

    #[inline]
    pub fn n_slots(&self) -> usize {
        self.buffers.len()
    }

    fn slot_of(&self, role: BufferRole) -> Option<usize> {
        let id = match role {
            BufferRole::Validity => return self.has_validity_buffer.then_some(0),
            BufferRole::Offset => self.layout.offset_buffer_id,
            BufferRole::LargeOffset => self.layout.large_offset_buffer_id,
            BufferRole::UnionTypes => self.layout.union_type_buffer_id,
            BufferRole::Data => self.layout.data_buffer_id,
            BufferRole::Child | BufferRole::Dictionary => None,
        }?;
        Some(id + self.has_validity_buffer as usize)
    }

    /// True when the node has a slot for `role`.
    #[inline]
    pub fn has_role(&self, role: BufferRole) -> bool {
        self.slot_of(role).is_some()
    }

    /// Allocated buffer of `role`, if any.
    pub fn buffer(&self, role: BufferRole) -> Option<&Buffer> {
        self.slot_of(role).and_then(|s| self.buffers[s].as_ref())
    }

    pub fn buffer_mut(&mut self, role: BufferRole) -> Option<&mut Buffer> {
        self.slot_of(role).and_then(|s| self.buffers[s].as_mut())
    }

    /// Bytes the buffer of `role` needs for `length` elements, or `None` when
    /// the layout has no such buffer.
    ///
    /// Variable-width data is sized from the last entry of the already
    /// allocated offsets buffer, so offsets must be in place first.
    pub fn required_bytes(&self, role: BufferRole) -> Result<Option<usize>> {
        if self.slot_of(role).is_none() {
            return Ok(None);
        }
        let n = self.length;
        let overflow = || ArrowVecError::invalid(format!("{role} buffer size overflows for {n} elements"));
        let bytes = match role {
            BufferRole::Validity => bytes_for_bits(n),
            BufferRole::Offset | BufferRole::LargeOffset => {
                let width = if role == BufferRole::Offset { 4 } else { 8 };
                let entries = if self.layout.offsets_per_row() {
                    n
                } else {
                    n.checked_add(1).ok_or_else(overflow)?
                };
                entries.checked_mul(width).ok_or_else(overflow)?
            }
            BufferRole::UnionTypes => n,
            BufferRole::Data => match self.layout.element_size {
                ElementSize::None => 0,
                ElementSize::Bit => bytes_for_bits(n),
                ElementSize::Fixed(w) => n.checked_mul(w).ok_or_else(overflow)?,
                ElementSize::Variable => {
                    let last = self.offset_value(n)?;
                    usize::try_from(last).map_err(|_| {
                        ArrowVecError::invalid(format!("negative last offset {last}"))
                    })?
                }
            },
            BufferRole::Child | BufferRole::Dictionary => return Ok(None),
        };
        Ok(Some(bytes))
    }

    /// Allocates zeroed buffers for every role in `which` that the layout has.
    ///
    /// Validity is only allocated when `src` has a non-null validity bitmap,
    /// otherwise its slot stays null. Already allocated buffers are kept.
    pub fn alloc_buffers(&mut self, which: BufferSet, src: &ArrowVector<'_>) -> Result<()> {
        for role in ROLES {
            if !which.contains(role.set()) {
                continue;
            }
            let Some(slot) = self.slot_of(role) else { continue };
            if self.buffers[slot].is_some() {
                continue;
            }
            if role == BufferRole::Validity && src.validity()?.is_none() {
                continue;
            }
            let Some(bytes) = self.required_bytes(role)? else { continue };
            trace!(%role, bytes, length = self.length, "allocating buffer");
            self.buffers[slot] = Some(Buffer::zeroed(bytes, role_name(role))?);
        }
        Ok(())
    }

    /// Offset entry `i` of the allocated offsets buffer.
    pub fn offset_value(&self, i: usize) -> Result<i64> {
        let (role, large) = match self.layout.any_offset_buffer() {
            Some((_, false)) => (BufferRole::Offset, false),
            Some((_, true)) => (BufferRole::LargeOffset, true),
            None => {
                return Err(ArrowVecError::invalid(format!(
                    "'{}' has no offsets buffer",
                    self.layout.arrow_type
                )));
            }
        };
        let buf = self
            .buffer(role)
            .ok_or_else(|| ArrowVecError::invalid("offsets buffer is not allocated"))?;
        read_offset(buf.as_slice(), i, large)
    }

    pub fn push_child(&mut self, child: OwnedArray) {
        self.children.push(child);
    }

    pub fn set_dictionary(&mut self, dictionary: OwnedArray) {
        self.dictionary = Some(dictionary);
    }

    #[inline]
    pub fn n_children(&self) -> usize {
        self.children.len()
    }

    /// Recomputes `null_count` from the validity bitmap.
    pub fn recount_nulls(&mut self) {
        self.null_count = if self.layout.arrow_type == ArrowType::Null {
            self.length as i64
        } else {
            match self.buffer(BufferRole::Validity) {
                Some(bits) => count_unset(bits.as_slice(), 0, self.length) as i64,
                None => 0,
            }
        };
    }

    /// Exports the parts as an owned node with `offset = 0`.
    pub fn into_owned(self) -> OwnedArray {
        OwnedArray::new(
            self.length as i64,
            self.null_count,
            0,
            self.buffers,
            self.children,
            self.dictionary,
        )
    }
}

fn role_name(role: BufferRole) -> &'static str {
    match role {
        BufferRole::Validity => "validity buffer",
        BufferRole::Offset => "offsets buffer",
        BufferRole::LargeOffset => "large offsets buffer",
        BufferRole::UnionTypes => "union type ids buffer",
        BufferRole::Data => "data buffer",
        BufferRole::Child => "child array",
        BufferRole::Dictionary => "dictionary array",
    }
}
