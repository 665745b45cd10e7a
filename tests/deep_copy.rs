//! Central test suite for deep copies of C Data Interface trees

use arrowvec::{
    ArrayParts, ArrowArray, ArrowType, ArrowVecError, ArrowVector, Buffer, BufferRole, BufferSet,
    OwnedArray, OwnedSchema, copy_buffer, deep_copy, deep_copy_vector,
};

fn utf8(offsets: &[i32], data: &[u8], length: i64, offset: i64) -> (OwnedSchema, OwnedArray) {
    let schema = OwnedSchema::builder("u").name("s").build().unwrap();
    let array = OwnedArray::new(
        length,
        0,
        offset,
        vec![None, Some(Buffer::from_values(offsets)), Some(Buffer::from_slice(data))],
        vec![],
        None,
    );
    (schema, array)
}

/// Reads element `i` of a bound utf8 vector.
fn string_at<'a>(v: &ArrowVector<'a>, i: usize) -> &'a str {
    let idx = v.offset().unwrap() + i;
    let start = v.offset_value(idx).unwrap() as usize;
    let end = v.offset_value(idx + 1).unwrap() as usize;
    std::str::from_utf8(&v.buffer(BufferRole::Data).unwrap()[start..end]).unwrap()
}

fn all_buffers(v: &ArrowVector<'_>) -> Vec<Vec<u8>> {
    let mut out = vec![v.validity().unwrap().map(<[u8]>::to_vec).unwrap_or_default()];
    for role in [BufferRole::Offset, BufferRole::LargeOffset, BufferRole::UnionTypes, BufferRole::Data] {
        if v.buffer_id(role).is_some() {
            out.push(v.buffer(role).unwrap().to_vec());
        }
    }
    out
}

// -------------------------------
// Strings
// -------------------------------
#[test]
fn test_string_column_copy() {
    let (schema, array) = utf8(&[0, 3, 3, 6], b"foobar", 3, 0);
    let (schema_copy, copy) = deep_copy(&schema, &array).unwrap();
    drop(array);
    drop(schema);

    let v = ArrowVector::bind(&schema_copy, Some(&copy)).unwrap();
    let values: Vec<&str> = (0..3).map(|i| string_at(&v, i)).collect();
    assert_eq!(values, vec!["foo", "", "bar"]);
    assert_eq!(schema_copy.name(), Some("s"));
    assert_eq!(copy.null_count, 0);
}

#[test]
fn test_string_slice_strips_offset() {
    let (schema, array) = utf8(&[0, 3, 3, 7, 9], b"foobar!xy", 2, 2);
    let (_, copy) = deep_copy(&schema, &array).unwrap();
    assert_eq!(copy.offset, 0);
    assert_eq!(copy.length, 2);

    let v = ArrowVector::bind(&schema, Some(&copy)).unwrap();
    assert_eq!(string_at(&v, 0), "bar!");
    assert_eq!(string_at(&v, 1), "xy");
    // Offsets are not rebased: the copy keeps 3, 7, 9.
    assert_eq!(v.offset_value(0).unwrap(), 3);
    let data = v.buffer(BufferRole::Data).unwrap();
    assert_eq!(data.len(), 9);
    assert_eq!(&data[..3], &[0, 0, 0]);
}

// -------------------------------
// Buffer-count validation
// -------------------------------
#[test]
fn test_buffer_count_acceptance() {
    let cases: &[(&str, usize)] = &[
        ("n", 0),
        ("b", 1),
        ("i", 1),
        ("w:3", 1),
        ("u", 2),
        ("Z", 2),
        ("+l", 1),
        ("+w:2", 0),
        ("+s", 0),
        ("+m", 1),
        ("+us:0", 1),
        ("+ud:0", 2),
    ];
    for &(format, declared) in cases {
        let schema = OwnedSchema::builder(format).build().unwrap();
        for n in 0..declared + 3 {
            let array = OwnedArray::new(0, 0, 0, vec![None; n], vec![], None);
            let bound = ArrowVector::bind(&schema, Some(&array));
            if n == declared || n == declared + 1 {
                assert_eq!(bound.unwrap().has_validity_buffer(), n == declared + 1, "{format} {n}");
            } else {
                let err = bound.unwrap_err();
                assert_eq!(
                    err,
                    ArrowVecError::invalid(format!(
                        "Expected {} or {} buffers in array but found {}",
                        declared,
                        declared + 1,
                        n
                    )),
                    "{format} {n}"
                );
            }
        }
    }
}

#[test]
fn test_four_buffers_for_utf8_rejected() {
    let schema = OwnedSchema::builder("u").build().unwrap();
    let array = OwnedArray::new(0, 0, 0, vec![None, None, None, None], vec![], None);
    let err = ArrowVector::bind(&schema, Some(&array)).unwrap_err();
    assert_eq!(err.to_string(), "Invalid argument: Expected 2 or 3 buffers in array but found 4");
    assert!(deep_copy(&schema, &array).is_err());
}

#[test]
fn test_released_inputs_rejected() {
    let schema = OwnedSchema::builder("i").build().unwrap();
    let released = ArrowArray::empty();
    assert_eq!(
        deep_copy(&schema, &released).unwrap_err(),
        ArrowVecError::invalid("array is released")
    );
}

// -------------------------------
// Nested
// -------------------------------
#[test]
fn test_list_of_int32_data_sized_from_offsets() {
    let item = OwnedSchema::builder_for(&ArrowType::Int32).name("item").build().unwrap();
    let schema = OwnedSchema::builder("+l").child(item).build().unwrap();
    let values: Vec<i32> = (0..10).collect();
    let child = OwnedArray::new(10, 0, 0, vec![None, Some(Buffer::from_values(&values))], vec![], None);
    let list = OwnedArray::new(
        5,
        0,
        0,
        vec![None, Some(Buffer::from_values(&[0i32, 2, 2, 5, 9, 10]))],
        vec![child],
        None,
    );

    let (schema_copy, copy) = deep_copy(&schema, &list).unwrap();
    let v = ArrowVector::bind(&schema_copy, Some(&copy)).unwrap();
    let last = v.offset_value(5).unwrap() as usize;
    let c = v.child(0).unwrap();
    assert_eq!(c.length().unwrap(), last);
    assert_eq!(c.buffer(BufferRole::Data).unwrap().len(), last * 4);
    assert_eq!(c.buffer(BufferRole::Data).unwrap(), Buffer::from_values(&values).as_slice());
}

#[test]
fn test_sliced_list_keeps_child_prefix() {
    let item = OwnedSchema::builder("s").build().unwrap();
    let schema = OwnedSchema::builder("+L").child(item).build().unwrap();
    let child = OwnedArray::new(6, 0, 0, vec![None, Some(Buffer::from_values(&[1i16, 2, 3, 4, 5, 6]))], vec![], None);
    let list = OwnedArray::new(
        1,
        0,
        1,
        vec![None, Some(Buffer::from_values(&[0i64, 2, 5, 6]))],
        vec![child],
        None,
    );
    let copy = OwnedArray::deep_copy(&schema, &list).unwrap();
    let v = ArrowVector::bind(&schema, Some(&copy)).unwrap();
    assert_eq!(v.offset_value(0).unwrap(), 2);
    assert_eq!(v.offset_value(1).unwrap(), 5);
    // The child keeps everything up to the last offset.
    assert_eq!(v.child(0).unwrap().length().unwrap(), 5);
}

#[test]
fn test_map_and_struct_tree() {
    let entries = OwnedSchema::builder("+s")
        .name("entries")
        .child(OwnedSchema::builder("u").name("key").build().unwrap())
        .child(OwnedSchema::builder("l").name("value").nullable(true).build().unwrap())
        .build()
        .unwrap();
    let schema = OwnedSchema::builder("+m").child(entries).build().unwrap();

    let keys = OwnedArray::new(
        3,
        0,
        0,
        vec![None, Some(Buffer::from_values(&[0i32, 1, 2, 3])), Some(Buffer::from_slice(b"abc"))],
        vec![],
        None,
    );
    let vals = OwnedArray::new(
        3,
        1,
        0,
        vec![Some(Buffer::from_slice(&[0b101])), Some(Buffer::from_values(&[10i64, 0, 30]))],
        vec![],
        None,
    );
    let entries = OwnedArray::new(3, 0, 0, vec![None], vec![keys, vals], None);
    let map = OwnedArray::new(2, 0, 0, vec![None, Some(Buffer::from_values(&[0i32, 1, 3]))], vec![entries], None);

    let (schema_copy, copy) = deep_copy(&schema, &map).unwrap();
    let v = ArrowVector::bind(&schema_copy, Some(&copy)).unwrap();
    let e = v.child(0).unwrap();
    assert_eq!(e.length().unwrap(), 3);
    let vals = e.child(1).unwrap();
    assert_eq!(vals.null_count().unwrap(), 1);
    assert_eq!(vals.validity().unwrap().unwrap(), &[0b101]);
    assert_eq!(e.child(0).unwrap().buffer(BufferRole::Data).unwrap(), b"abc");
}

// -------------------------------
// Properties
// -------------------------------
#[test]
fn test_deep_copy_is_idempotent() {
    let (schema, array) = utf8(&[0, 3, 3, 7, 9], b"foobar!xy", 3, 1);
    let (s1, a1) = deep_copy(&schema, &array).unwrap();
    let (s2, a2) = deep_copy(&s1, &a1).unwrap();

    let v1 = ArrowVector::bind(&s1, Some(&a1)).unwrap();
    let v2 = ArrowVector::bind(&s2, Some(&a2)).unwrap();
    assert_eq!(all_buffers(&v1), all_buffers(&v2));
    assert_eq!((a1.length, a1.offset, a1.null_count), (a2.length, a2.offset, a2.null_count));
    assert_eq!(s1.format_str().unwrap(), s2.format_str().unwrap());
}

#[test]
fn test_copy_does_not_alias_source() {
    let (schema, array) = utf8(&[0, 1], b"z", 1, 0);
    let copy = OwnedArray::deep_copy(&schema, &array).unwrap();
    for slot in 1..3 {
        assert_ne!(copy.buffer_ptr(slot).unwrap(), array.buffer_ptr(slot).unwrap());
    }
}

#[test]
fn test_validity_bits_survive_unaligned_slice() {
    let schema = OwnedSchema::builder("c").build().unwrap();
    let bits = [0b0110_1101u8, 0b1001_0110, 0b0000_0011];
    let array = OwnedArray::new(
        17,
        -1,
        3,
        vec![Some(Buffer::from_slice(&bits)), Some(Buffer::zeroed(20, "data").unwrap())],
        vec![],
        None,
    );
    let src = ArrowVector::bind(&schema, Some(&array)).unwrap();
    let copy = deep_copy_vector(&src).unwrap();
    let v = ArrowVector::bind(&schema, Some(&copy)).unwrap();
    let out = v.validity().unwrap().unwrap();
    let get = |b: &[u8], i: usize| (b[i / 8] >> (i % 8)) & 1 == 1;
    let mut nulls = 0;
    for i in 0..17 {
        assert_eq!(get(out, i), get(&bits, i + 3), "bit {i}");
        nulls += !get(&bits, i + 3) as i64;
    }
    assert_eq!(copy.null_count, nulls);
}

#[test]
fn test_copy_buffer_into_offset_destination() {
    let schema = OwnedSchema::builder("b").build().unwrap();
    let array = OwnedArray::new(4, 0, 0, vec![Some(Buffer::from_slice(&[0b1001]))], vec![], None);
    let src = ArrowVector::bind(&schema, Some(&array)).unwrap();
    let mut dst = ArrayParts::allocate_structure(&src, 16);
    dst.alloc_buffers(BufferSet::DATA, &src).unwrap();
    dst.buffer_mut(BufferRole::Data).unwrap().as_mut_slice().copy_from_slice(&[0xFF, 0xFF]);
    copy_buffer(BufferRole::Data, &mut dst, 5, &src, 0, 4).unwrap();
    // Bits 5..9 take 1,0,0,1; all others stay set.
    assert_eq!(dst.buffer(BufferRole::Data).unwrap().as_slice(), &[0b0011_1111, 0b1111_1111]);
}
