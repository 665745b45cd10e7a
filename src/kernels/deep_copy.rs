//! # **Deep Copy** - *Independent, offset-free copies of schema/array trees*
//!
//! Produces a fully owned copy of an array tree that shares no memory with its
//! source. Only the visible window `[offset, offset + length)` of each node is
//! copied, and every copied node has `offset = 0`.
//!
//! ## Sequence per node
//! 1. Shape the destination after the source: same slot count, empty slots.
//! 2. Allocate and copy validity, offsets and union type ids.
//! 3. Recurse into children and the dictionary. List-like children are sized
//!    from the offsets copied in step 2.
//! 4. Allocate and copy the data buffer. Variable-width data is sized from the
//!    last copied offset, so it must come after step 2.
//! 5. Recount nulls from the copied validity bits.
//!
//! Offsets are copied without rebasing, so a sliced string column keeps its
//! original offset values and the data bytes in front of the first offset are
//! zero in the copy.
//!
//! Any failure drops the partial node, freeing its buffers and releasing the
//! children already copied.

use tracing::debug;

use crate::enums::buffer_role::BufferSet;
use crate::enums::error::{ArrowVecError, Result};
use crate::ffi::array::OwnedArray;
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema};
use crate::ffi::arrow_dtype::{ArrowType, UnionMode};
use crate::ffi::schema::OwnedSchema;
use crate::kernels::copy::copy_buffers;
use crate::structs::array::ArrayParts;
use crate::structs::vector::ArrowVector;

const PHASE_A: BufferSet = BufferSet::VALIDITY
    .union(BufferSet::OFFSET)
    .union(BufferSet::UNION_TYPE);

/// Deep copies a schema and its array.
pub fn deep_copy(schema: &ArrowSchema, array: &ArrowArray) -> Result<(OwnedSchema, OwnedArray)> {
    let array = deep_copy_array(schema, array)?;
    let schema = OwnedSchema::deep_copy(schema)?;
    Ok((schema, array))
}

/// Deep copies the array of a bound vector.
pub fn deep_copy_vector(src: &ArrowVector<'_>) -> Result<OwnedArray> {
    copy_window(src, src.offset()?, src.length()?)
}

pub(crate) fn deep_copy_array(schema: &ArrowSchema, array: &ArrowArray) -> Result<OwnedArray> {
    deep_copy_vector(&ArrowVector::bind(schema, Some(array))?)
}

/// Copies elements `[start, start + length)` of `src`, indices absolute.
fn copy_window(src: &ArrowVector<'_>, start: usize, length: usize) -> Result<OwnedArray> {
    debug!(format = %src.arrow_type(), start, length, "deep copy");
    let mut dst = ArrayParts::allocate_structure(src, length);

    dst.alloc_buffers(PHASE_A, src)?;
    copy_buffers(PHASE_A, &mut dst, 0, src, start, length)?;

    for child in src.children()? {
        let (child_start, child_len) = child_window(src, &dst, &child, start, length)?;
        dst.push_child(copy_window(&child, child_start, child_len)?);
    }
    if let Some(dict) = src.dictionary()? {
        dst.set_dictionary(copy_window(&dict, dict.offset()?, dict.length()?)?);
    }

    dst.alloc_buffers(BufferSet::DATA, src)?;
    copy_buffers(BufferSet::DATA, &mut dst, 0, src, start, length)?;

    dst.recount_nulls();
    Ok(dst.into_owned())
}

/// Window of `child` that backs parent elements `[start, start + n)`.
fn child_window(
    parent: &ArrowVector<'_>,
    dst: &ArrayParts,
    child: &ArrowVector<'_>,
    start: usize,
    n: usize,
) -> Result<(usize, usize)> {
    let overflow = || ArrowVecError::invalid("child window overflows");
    let base = child.offset()?;
    match parent.arrow_type() {
        ArrowType::Struct
        | ArrowType::Union {
            mode: UnionMode::Sparse,
            ..
        } => Ok((base.checked_add(start).ok_or_else(overflow)?, n)),
        ArrowType::FixedSizeList(size) => {
            let from = start
                .checked_mul(*size)
                .and_then(|s| s.checked_add(base))
                .ok_or_else(overflow)?;
            Ok((from, n.checked_mul(*size).ok_or_else(overflow)?))
        }
        ArrowType::List | ArrowType::LargeList | ArrowType::Map => {
            let last = dst.offset_value(n)?;
            let last = usize::try_from(last)
                .map_err(|_| ArrowVecError::invalid(format!("negative last offset {last}")))?;
            Ok((base, last))
        }
        ArrowType::Union {
            mode: UnionMode::Dense,
            ..
        } => Ok((base, child.length()?)),
        other => Err(ArrowVecError::invalid(format!(
            "'{other}' cannot have children"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::buffer_role::BufferRole;
    use crate::structs::buffer::Buffer;

    fn i32_array(values: &[i32], offset: i64, length: i64) -> OwnedArray {
        OwnedArray::new(length, 0, offset, vec![None, Some(Buffer::from_values(values))], vec![], None)
    }

    #[test]
    fn test_struct_child_windows_follow_parent_slice() {
        let schema = OwnedSchema::builder("+s")
            .child(OwnedSchema::builder("i").build().unwrap())
            .build()
            .unwrap();
        // Child has its own offset of 1 on top of the parent's offset of 2.
        let child = i32_array(&[0, 1, 2, 3, 4, 5, 6], 1, 6);
        let parent = OwnedArray::new(3, 0, 2, vec![None], vec![child], None);

        let copy = deep_copy_array(&schema, &parent).unwrap();
        let v = ArrowVector::bind(&schema, Some(&copy)).unwrap();
        assert_eq!(v.offset().unwrap(), 0);
        let c = v.child(0).unwrap();
        assert_eq!((c.offset().unwrap(), c.length().unwrap()), (0, 3));
        assert_eq!(c.buffer(BufferRole::Data).unwrap(), Buffer::from_values(&[3i32, 4, 5]).as_slice());
    }

    #[test]
    fn test_fixed_size_list_window() {
        let schema = OwnedSchema::builder("+w:2")
            .child(OwnedSchema::builder("c").build().unwrap())
            .build()
            .unwrap();
        let child = OwnedArray::new(8, 0, 0, vec![None, Some(Buffer::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]))], vec![], None);
        let parent = OwnedArray::new(2, 0, 1, vec![None], vec![child], None);
        let copy = deep_copy_array(&schema, &parent).unwrap();
        let v = ArrowVector::bind(&schema, Some(&copy)).unwrap();
        let c = v.child(0).unwrap();
        assert_eq!(c.buffer(BufferRole::Data).unwrap(), &[3, 4, 5, 6]);
    }

    #[test]
    fn test_dense_union_copies_full_children() {
        let schema = OwnedSchema::builder("+ud:0,1")
            .child(OwnedSchema::builder("i").build().unwrap())
            .child(OwnedSchema::builder("u").build().unwrap())
            .build()
            .unwrap();
        let ints = i32_array(&[7, 8], 0, 2);
        let strs = OwnedArray::new(
            1,
            0,
            0,
            vec![None, Some(Buffer::from_values(&[0i32, 2])), Some(Buffer::from_slice(b"hi"))],
            vec![],
            None,
        );
        let union = OwnedArray::new(
            3,
            0,
            1,
            vec![
                Some(Buffer::from_slice(&[0, 0, 1, 0])),
                Some(Buffer::from_values(&[0i32, 1, 0, 1])),
            ],
            vec![ints, strs],
            None,
        );
        let copy = deep_copy_array(&schema, &union).unwrap();
        assert_eq!(copy.n_buffers, 2);
        let v = ArrowVector::bind(&schema, Some(&copy)).unwrap();
        assert_eq!(v.buffer(BufferRole::UnionTypes).unwrap(), &[0, 1, 0]);
        assert_eq!(v.buffer(BufferRole::Offset).unwrap(), Buffer::from_values(&[1i32, 0, 1]).as_slice());
        assert_eq!(v.child(0).unwrap().length().unwrap(), 2);
        assert_eq!(v.child(1).unwrap().buffer(BufferRole::Data).unwrap(), b"hi");
    }

    #[test]
    fn test_dictionary_copied_whole() {
        let schema = OwnedSchema::builder("C")
            .dictionary(OwnedSchema::builder("u").build().unwrap())
            .build()
            .unwrap();
        let dict = OwnedArray::new(
            2,
            0,
            0,
            vec![None, Some(Buffer::from_values(&[0i32, 1, 3])), Some(Buffer::from_slice(b"abc"))],
            vec![],
            None,
        );
        let codes = OwnedArray::new(4, 0, 2, vec![None, Some(Buffer::from_slice(&[1, 0, 1, 1, 0, 0]))], vec![], Some(dict));
        let (schema_copy, copy) = deep_copy(&schema, &codes).unwrap();
        let v = ArrowVector::bind(&schema_copy, Some(&copy)).unwrap();
        assert_eq!(v.buffer(BufferRole::Data).unwrap(), &[1, 1, 0, 0]);
        let d = v.dictionary().unwrap().unwrap();
        assert_eq!(d.length().unwrap(), 2);
        assert_eq!(d.buffer(BufferRole::Data).unwrap(), b"abc");
    }

    #[test]
    fn test_child_window_out_of_bounds_fails() {
        let schema = OwnedSchema::builder("+s")
            .child(OwnedSchema::builder("i").build().unwrap())
            .build()
            .unwrap();
        let child = i32_array(&[1, 2], 0, 2);
        let parent = OwnedArray::new(4, 0, 0, vec![None], vec![child], None);
        let err = deep_copy_array(&schema, &parent).unwrap_err();
        assert!(matches!(err, ArrowVecError::InvalidArgument(_)));
    }

    #[test]
    fn test_primitive_with_children_rejected() {
        let schema = OwnedSchema::builder("i")
            .child(OwnedSchema::builder("i").build().unwrap())
            .build()
            .unwrap();
        let child = i32_array(&[1], 0, 1);
        let parent = OwnedArray::new(1, 0, 0, vec![None, Some(Buffer::from_values(&[1i32]))], vec![child], None);
        assert!(deep_copy_array(&schema, &parent).is_err());
    }

    #[test]
    fn test_sparse_union_with_missing_child_rejected() {
        let schema = OwnedSchema::builder("+us:0,1")
            .child(OwnedSchema::builder("i").build().unwrap())
            .build()
            .unwrap();
        let ints = i32_array(&[7, 8], 0, 2);
        let union = OwnedArray::new(2, 0, 0, vec![Some(Buffer::from_slice(&[0, 0]))], vec![ints], None);
        let err = deep_copy_array(&schema, &union).unwrap_err();
        assert_eq!(err, ArrowVecError::invalid("union declares 2 type ids but has 1 children"));
    }
}
