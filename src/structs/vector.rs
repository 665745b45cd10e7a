//! # **ArrowVector** - *A schema bound to its array*
//!
//! [`ArrowVector`] pairs a borrowed [`ArrowSchema`] and its optional
//! [`ArrowArray`] with the [`BufferLayout`] parsed from the format string, and
//! resolves whether the array carries a validity bitmap.
//!
//! ## Binding rules
//! - A released schema or array is rejected before anything else is read.
//! - The array's `n_buffers` must be the declared count (no validity bitmap) or
//!   the declared count plus one (validity bitmap in slot 0).
//!
//! ## Buffer access
//! Buffers are exposed as slices sized to what the C Data Interface guarantees
//! the producer allocated for `offset + length` elements. Everything past that
//! extent is off limits, so reads are bounds-checked against it.
//!
//! The vector borrows both nodes. Bind again after either changes.

use std::mem::size_of;
use std::slice;

use num_traits::PrimInt;

use crate::enums::buffer_role::BufferRole;
use crate::enums::error::{ArrowVecError, Result};
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema, non_negative};
use crate::ffi::arrow_dtype::ArrowType;
use crate::ffi::layout::{BufferLayout, ElementSize};
use crate::structs::bitmask::bytes_for_bits;

#[derive(Debug, Clone)]
pub struct ArrowVector<'a> {
    schema: &'a ArrowSchema,
    array: Option<&'a ArrowArray>,
    layout: BufferLayout,
    has_validity_buffer: bool,
}

impl<'a> ArrowVector<'a> {
    /// Binds `schema` and, optionally, `array`.
    ///
    /// Without an array the vector only describes the type.
    pub fn bind(schema: &'a ArrowSchema, array: Option<&'a ArrowArray>) -> Result<Self> {
        if schema.is_released() {
            return Err(ArrowVecError::invalid("schema is released"));
        }
        let layout = BufferLayout::parse(schema.format_str()?)?;

        let mut has_validity_buffer = false;
        if let Some(array) = array {
            if array.is_released() {
                return Err(ArrowVecError::invalid("array is released"));
            }
            let declared = layout.n_buffers as i64;
            if array.n_buffers == declared + 1 {
                has_validity_buffer = true;
            } else if array.n_buffers != declared {
                return Err(ArrowVecError::invalid(format!(
                    "Expected {} or {} buffers in array but found {}",
                    declared,
                    declared + 1,
                    array.n_buffers
                )));
            }
        }

        Ok(Self {
            schema,
            array,
            layout,
            has_validity_buffer,
        })
    }

    #[inline]
    pub fn schema(&self) -> &'a ArrowSchema {
        self.schema
    }

    #[inline]
    pub fn array(&self) -> Option<&'a ArrowArray> {
        self.array
    }

    #[inline]
    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    #[inline]
    pub fn arrow_type(&self) -> &ArrowType {
        &self.layout.arrow_type
    }

    #[inline]
    pub fn has_validity_buffer(&self) -> bool {
        self.has_validity_buffer
    }

    /// Physical buffer slot of non-validity buffer `id`.
    #[inline]
    pub fn slot(&self, id: usize) -> usize {
        id + self.has_validity_buffer as usize
    }

    #[inline]
    pub fn is_dictionary_encoded(&self) -> bool {
        !self.schema.dictionary.is_null()
    }

    fn require_array(&self) -> Result<&'a ArrowArray> {
        self.array
            .ok_or_else(|| ArrowVecError::invalid("vector is not bound to an array"))
    }

    pub fn length(&self) -> Result<usize> {
        non_negative(self.require_array()?.length, "length")
    }

    pub fn offset(&self) -> Result<usize> {
        non_negative(self.require_array()?.offset, "offset")
    }

    /// Null count as reported by the producer; `-1` means not computed.
    pub fn null_count(&self) -> Result<i64> {
        Ok(self.require_array()?.null_count)
    }

    /// `offset + length`: the element extent every buffer must cover.
    fn extent(&self) -> Result<usize> {
        self.offset()?
            .checked_add(self.length()?)
            .ok_or_else(|| ArrowVecError::invalid("offset + length overflows"))
    }

    /// Number of child schemas. When an array is bound, its child count must agree.
    pub fn n_children(&self) -> Result<usize> {
        let n = non_negative(self.schema.n_children, "n_children")?;
        if let ArrowType::Union { type_ids, .. } = &self.layout.arrow_type {
            if type_ids.len() != n {
                return Err(ArrowVecError::invalid(format!(
                    "union declares {} type ids but has {n} children",
                    type_ids.len()
                )));
            }
        }
        if let Some(array) = self.array {
            if array.n_children != self.schema.n_children {
                return Err(ArrowVecError::invalid(format!(
                    "Expected {} children in array but found {}",
                    self.schema.n_children, array.n_children
                )));
            }
        }
        Ok(n)
    }

    /// Binds child `i`.
    pub fn child(&self, i: usize) -> Result<ArrowVector<'a>> {
        let n = self.n_children()?;
        if i >= n {
            return Err(ArrowVecError::invalid(format!(
                "child {i} out of range for vector with {n} children"
            )));
        }
        let array = self.array.map(|a| a.child(i)).transpose()?;
        ArrowVector::bind(self.schema.child(i)?, array)
    }

    /// Binds every child in order.
    pub fn children(&self) -> Result<Vec<ArrowVector<'a>>> {
        (0..self.n_children()?).map(|i| self.child(i)).collect()
    }

    /// Binds the dictionary values, if the schema is dictionary encoded.
    pub fn dictionary(&self) -> Result<Option<ArrowVector<'a>>> {
        let array_dict = self.array.and_then(ArrowArray::dictionary_ref);
        let Some(schema_dict) = self.schema.dictionary_ref() else {
            if array_dict.is_some() {
                return Err(ArrowVecError::invalid(
                    "array has a dictionary but its schema is not dictionary encoded",
                ));
            }
            return Ok(None);
        };
        if !self.layout.arrow_type.is_integer() {
            return Err(ArrowVecError::invalid(format!(
                "dictionary index type must be an integer, found '{}'",
                self.layout.arrow_type
            )));
        }
        if self.array.is_some() && array_dict.is_none() {
            return Err(ArrowVecError::invalid(
                "schema is dictionary encoded but array has no dictionary",
            ));
        }
        ArrowVector::bind(schema_dict, array_dict).map(Some)
    }

    /// Buffer id holding `role`, if the layout has one.
    pub fn buffer_id(&self, role: BufferRole) -> Option<usize> {
        match role {
            BufferRole::Offset => self.layout.offset_buffer_id,
            BufferRole::LargeOffset => self.layout.large_offset_buffer_id,
            BufferRole::UnionTypes => self.layout.union_type_buffer_id,
            BufferRole::Data => self.layout.data_buffer_id,
            BufferRole::Validity | BufferRole::Child | BufferRole::Dictionary => None,
        }
    }

    /// Raw pointer in the slot of `role`, or null when the layout has no such buffer.
    pub fn buffer_ptr(&self, role: BufferRole) -> Result<*const u8> {
        let array = self.require_array()?;
        let slot = match role {
            BufferRole::Validity if self.has_validity_buffer => 0,
            _ => match self.buffer_id(role) {
                Some(id) => self.slot(id),
                None => return Ok(std::ptr::null()),
            },
        };
        array.buffer_ptr(slot)
    }

    /// Byte size the producer guarantees for the buffer of `role`.
    ///
    /// Variable-width data is sized by the offset at `offset + length`.
    pub fn buffer_extent(&self, role: BufferRole) -> Result<usize> {
        let n = self.extent()?;
        let bytes = match role {
            BufferRole::Validity => Some(bytes_for_bits(n)),
            BufferRole::Offset | BufferRole::LargeOffset => {
                if self.buffer_id(role).is_none() {
                    return Ok(0);
                }
                let width = if role == BufferRole::Offset { 4 } else { 8 };
                let entries = if self.layout.offsets_per_row() { Some(n) } else { n.checked_add(1) };
                entries.and_then(|e| e.checked_mul(width))
            }
            BufferRole::UnionTypes => {
                if self.layout.union_type_buffer_id.is_none() {
                    return Ok(0);
                }
                Some(n)
            }
            BufferRole::Data => match self.layout.element_size {
                ElementSize::None => Some(0),
                ElementSize::Bit => Some(bytes_for_bits(n)),
                ElementSize::Fixed(w) => n.checked_mul(w),
                ElementSize::Variable => Some(non_negative(self.offset_value(n)?, "data end offset")?),
            },
            BufferRole::Child | BufferRole::Dictionary => Some(0),
        };
        bytes.ok_or_else(|| ArrowVecError::invalid(format!("{role} buffer size overflows")))
    }

    /// The validity bitmap covering `offset + length` bits, or `None` when absent.
    pub fn validity(&self) -> Result<Option<&'a [u8]>> {
        if !self.has_validity_buffer {
            return Ok(None);
        }
        let ptr = self.buffer_ptr(BufferRole::Validity)?;
        if ptr.is_null() {
            return Ok(None);
        }
        let len = self.buffer_extent(BufferRole::Validity)?;
        // SAFETY: a non-null validity buffer covers `offset + length` bits.
        Ok(Some(unsafe { slice::from_raw_parts(ptr, len) }))
    }

    /// The buffer of `role` as a slice of its guaranteed extent.
    ///
    /// Empty when the layout has no such buffer or the extent is zero.
    pub fn buffer(&self, role: BufferRole) -> Result<&'a [u8]> {
        if role == BufferRole::Validity {
            return Ok(self.validity()?.unwrap_or(&[]));
        }
        if matches!(role, BufferRole::Child | BufferRole::Dictionary) {
            return Err(ArrowVecError::invalid(format!("{role} is not a buffer role")));
        }
        let ptr = self.buffer_ptr(role)?;
        let len = self.buffer_extent(role)?;
        if len == 0 {
            return Ok(&[]);
        }
        if ptr.is_null() {
            return Err(ArrowVecError::invalid(format!(
                "{role} buffer of '{}' is NULL but must hold {len} bytes",
                self.layout.arrow_type
            )));
        }
        // SAFETY: the producer guarantees `len` readable bytes behind a non-null pointer.
        Ok(unsafe { slice::from_raw_parts(ptr, len) })
    }

    /// Offset entry `i` (absolute, i.e. already including the array offset),
    /// read from whichever offsets buffer the layout declares.
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
        read_offset(self.buffer(role)?, i, large)
    }
}

/// Reads offset `i` from an offsets buffer of 32-bit or, when `large`, 64-bit entries.
pub(crate) fn read_offset(bytes: &[u8], i: usize, large: bool) -> Result<i64> {
    if large {
        read_offset_as::<i64>(bytes, i)
    } else {
        read_offset_as::<i32>(bytes, i)
    }
}

fn read_offset_as<T: PrimInt>(bytes: &[u8], i: usize) -> Result<i64> {
    let width = size_of::<T>();
    let start = i
        .checked_mul(width)
        .filter(|s| s.checked_add(width).is_some_and(|end| end <= bytes.len()))
        .ok_or_else(|| {
            ArrowVecError::invalid(format!(
                "offset {i} out of bounds for offsets buffer of {} bytes",
                bytes.len()
            ))
        })?;
    // SAFETY: `start + width <= bytes.len()` was checked above.
    let v = unsafe { (bytes.as_ptr().add(start) as *const T).read_unaligned() };
    v.to_i64()
        .ok_or_else(|| ArrowVecError::invalid("offset value does not fit in i64"))
}
