//! # Array Module - *Owned ArrowArray trees*
//!
//! [`OwnedArray`] owns an `ArrowArray` node and releases it once on drop.
//! Nodes created through [`OwnedArray::new`] keep their buffers in a private
//! holder, so the exported pointers stay valid for as long as the node lives,
//! including after it has been moved to a consumer via [`OwnedArray::export_to`].

use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr;

use crate::enums::error::Result;
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema, build_array};
use crate::kernels::deep_copy::deep_copy_array;
use crate::structs::buffer::Buffer;

/// Owned `ArrowArray` node.
#[derive(Debug)]
pub struct OwnedArray(Box<ArrowArray>);

// The node exclusively owns its holder, buffers and children.
unsafe impl Send for OwnedArray {}

impl OwnedArray {
    /// Builds a node from its buffer slots. `None` slots are exported as null
    /// pointers, e.g. an absent validity bitmap.
    pub fn new(
        length: i64,
        null_count: i64,
        offset: i64,
        buffers: Vec<Option<Buffer>>,
        children: Vec<OwnedArray>,
        dictionary: Option<OwnedArray>,
    ) -> Self {
        OwnedArray(Box::new(build_array(
            length,
            null_count,
            offset,
            buffers,
            children.into_iter().map(OwnedArray::into_box).collect(),
            dictionary.map(OwnedArray::into_box),
        )))
    }

    /// Takes ownership of the node at `ptr`, leaving a released node behind.
    ///
    /// # Safety
    /// `ptr` must point to a valid ArrowArray that the caller owns.
    pub unsafe fn from_raw(ptr: *mut ArrowArray) -> Self {
        let node = unsafe { ptr::replace(ptr, ArrowArray::empty()) };
        OwnedArray(Box::new(node))
    }

    /// Gives up ownership. The caller must eventually release the node and free the box.
    pub fn into_raw(self) -> *mut ArrowArray {
        Box::into_raw(self.into_box())
    }

    /// Moves the node into `out`. The consumer becomes responsible for releasing it.
    ///
    /// # Safety
    /// `out` must be valid for writes; any node already there is overwritten, not released.
    pub unsafe fn export_to(self, out: *mut ArrowArray) {
        let node = *self.into_box();
        unsafe { ptr::write(out, node) };
    }

    pub(crate) fn into_box(self) -> Box<ArrowArray> {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never dropped, so the box is moved out exactly once.
        unsafe { ptr::read(&me.0) }
    }

    /// Deep copies `array` as described by `schema` into fresh buffers.
    ///
    /// The copy has `offset == 0` and holds only the visible window of the source.
    #[inline]
    pub fn deep_copy(schema: &ArrowSchema, array: &ArrowArray) -> Result<Self> {
        deep_copy_array(schema, array)
    }
}

impl Deref for OwnedArray {
    type Target = ArrowArray;

    fn deref(&self) -> &ArrowArray {
        &self.0
    }
}

impl Drop for OwnedArray {
    fn drop(&mut self) {
        if let Some(release) = self.0.release {
            unsafe { release(self.0.as_mut() as *mut ArrowArray) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_array_new_and_drop() {
        let child = OwnedArray::new(2, 0, 0, vec![None, Some(Buffer::from_values(&[1i64, 2]))], vec![], None);
        let a = OwnedArray::new(2, 0, 0, vec![None], vec![child], None);
        assert_eq!(a.n_children, 1);
        let c = a.child(0).unwrap();
        assert_eq!(c.n_buffers, 2);
        assert!(c.buffer_ptr(0).unwrap().is_null());
        assert!(!a.is_released());
    }

    #[test]
    fn test_owned_array_export_and_reimport() {
        let a = OwnedArray::new(3, 1, 0, vec![Some(Buffer::from_slice(&[0b011]))], vec![], None);
        let mut out = ArrowArray::empty();
        unsafe { a.export_to(&mut out) };
        assert_eq!(out.length, 3);
        assert_eq!(out.null_count, 1);

        let back = unsafe { OwnedArray::from_raw(&mut out) };
        assert!(out.is_released());
        let bits = back.buffer_ptr(0).unwrap();
        assert_eq!(unsafe { *bits }, 0b011);

        let raw = back.into_raw();
        let again = unsafe { OwnedArray::from_raw(raw) };
        unsafe { drop(Box::from_raw(raw)) };
        assert_eq!(again.length, 3);
    }
}
