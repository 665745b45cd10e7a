//! # **Buffer** — *Owned, zeroed, 64-byte aligned byte storage*
//!
//! Every buffer this crate hands out through an `ArrowArray` is a `Buffer`.
//!
//! ## Behaviour
//! - Backed by [`Vec64<u8>`], so the data pointer is always 64-byte aligned,
//!   comfortably above the 8-byte minimum the C Data Interface asks for.
//! - Allocation is zero-initialised: padding and any bytes a copy does not
//!   touch are deterministic, which keeps repeated deep copies byte-identical.
//! - Sizes above `isize::MAX` are rejected as allocation failures up front.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use num_traits::ToBytes;
use vec64::Vec64;

use crate::enums::error::{ArrowVecError, Result};

#[derive(Clone, PartialEq, Default)]
pub struct Buffer {
    bytes: Vec64<u8>,
}

impl Buffer {
    /// Allocates `len` zeroed bytes.
    pub fn zeroed(len: usize, what: &'static str) -> Result<Self> {
        if len > isize::MAX as usize {
            return Err(ArrowVecError::AllocationFailure { bytes: len, what });
        }
        let mut bytes = Vec64::with_capacity(len);
        bytes.resize(len, 0u8);
        Ok(Self { bytes })
    }

    /// Copies raw bytes into a new buffer.
    #[inline]
    pub fn from_slice(slice: &[u8]) -> Self {
        let mut bytes = Vec64::with_capacity(slice.len());
        bytes.extend_from_slice(slice);
        Self { bytes }
    }

    /// Builds a buffer from native-endian values, e.g. offsets or `i32` data.
    pub fn from_values<T: ToBytes>(values: &[T]) -> Self {
        let mut bytes = Vec64::with_capacity(values.len() * std::mem::size_of::<T>());
        for v in values {
            bytes.extend_from_slice(v.to_ne_bytes().as_ref());
        }
        Self { bytes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.bytes.as_mut_slice()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Buffer(len={}, {:?})", self.len(), self.as_slice())
    }
}
