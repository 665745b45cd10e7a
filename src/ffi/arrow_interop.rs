//! # Arrow Interop Module - *Moving trees to and from `arrow-rs`*
//!
//! Crosses the C Data Interface in both directions. Nothing is copied on the
//! way: the receiving side takes ownership of the node and releases it.
//! Combine with [`OwnedArray::deep_copy`] for an independent copy.

use arrow::array::{Array, ArrayRef, make_array};
use arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi, to_ffi};

use crate::enums::error::{ArrowVecError, Result};
use crate::ffi::array::OwnedArray;
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema};
use crate::ffi::schema::OwnedSchema;

impl OwnedArray {
    /// Imports an `arrow-rs` array, returning its schema and array nodes.
    pub fn from_arrow(array: &dyn Array) -> Result<(OwnedSchema, OwnedArray)> {
        let (mut ffi_arr, mut ffi_sch) =
            to_ffi(&array.to_data()).map_err(|e| ArrowVecError::invalid(e.to_string()))?;

        // Both structs share the C layout. Moving out leaves released nodes,
        // so the arrow-side drops below are no-ops.
        let array = unsafe { OwnedArray::from_raw(&mut ffi_arr as *mut FFI_ArrowArray as *mut ArrowArray) };
        let schema =
            unsafe { OwnedSchema::from_raw(&mut ffi_sch as *mut FFI_ArrowSchema as *mut ArrowSchema) };
        Ok((schema, array))
    }

    /// Moves this array, described by `schema`, into `arrow-rs`.
    pub fn to_arrow(self, schema: OwnedSchema) -> Result<ArrayRef> {
        let arr_ptr = self.into_raw();
        let sch_ptr = schema.into_raw();
        let (ffi_arr, ffi_sch) = unsafe {
            let ffi_arr = FFI_ArrowArray::from_raw(arr_ptr as *mut FFI_ArrowArray);
            let ffi_sch = FFI_ArrowSchema::from_raw(sch_ptr as *mut FFI_ArrowSchema);
            // The boxes now hold released nodes.
            drop(Box::from_raw(arr_ptr));
            drop(Box::from_raw(sch_ptr));
            (ffi_arr, ffi_sch)
        };
        let data = unsafe { from_ffi(ffi_arr, &ffi_sch) }
            .map_err(|e| ArrowVecError::invalid(e.to_string()))?;
        Ok(make_array(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};

    #[test]
    fn test_arrow_roundtrip_through_deep_copy() {
        let src = StringArray::from(vec![Some("a"), None, Some("ccc")]);
        let (schema, array) = OwnedArray::from_arrow(&src).unwrap();
        assert_eq!(schema.format_str().unwrap(), "u");

        let copy = OwnedArray::deep_copy(&schema, &array).unwrap();
        drop(array);
        let back = copy.to_arrow(schema).unwrap();
        let back = back.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(back, &src);
    }

    #[test]
    fn test_arrow_sliced_copy() {
        let src = Int32Array::from(vec![1, 2, 3, 4, 5]);
        let sliced = src.slice(2, 2);
        let (schema, array) = OwnedArray::from_arrow(&sliced).unwrap();
        let copy = OwnedArray::deep_copy(&schema, &array).unwrap();
        assert_eq!(copy.offset, 0);
        assert_eq!(copy.length, 2);
        let back = copy.to_arrow(schema).unwrap();
        let back = back.as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(back.values().as_ref(), &[3, 4]);
    }
}
