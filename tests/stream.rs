//! ArrowArrayStream export/import round trips

#![cfg(feature = "stream")]

use arrowvec::{
    ArrayStreamReader, ArrowArrayStream, ArrowVector, Buffer, BufferRole, OwnedArray, OwnedSchema,
    export_array_stream,
};

#[test]
fn test_stream_roundtrip_via_raw_pointer() {
    let schema = OwnedSchema::builder("u").name("words").build().unwrap();
    let array = OwnedArray::new(
        2,
        0,
        0,
        vec![None, Some(Buffer::from_values(&[0i32, 2, 5])), Some(Buffer::from_slice(b"hiyou"))],
        vec![],
        None,
    );

    // Consumer side allocates the stream struct, producer fills it.
    let mut out = Box::new(ArrowArrayStream::empty());
    let stream = export_array_stream(schema, Some(array));
    unsafe { std::ptr::write(out.as_mut(), stream) };

    let mut reader = unsafe { ArrayStreamReader::from_raw(out.as_mut()) }.unwrap();
    assert!(out.is_released());

    let schema = OwnedSchema::deep_copy(reader.schema()).unwrap();
    let arrays: Vec<OwnedArray> = reader.by_ref().map(Result::unwrap).collect();
    assert_eq!(arrays.len(), 1);

    let v = ArrowVector::bind(&schema, Some(&arrays[0])).unwrap();
    assert_eq!(v.buffer(BufferRole::Data).unwrap(), b"hiyou");
    assert!(reader.next().is_none());
}

#[test]
fn test_deep_copied_stream_schemas_are_independent() {
    let schema = OwnedSchema::builder("+s")
        .child(OwnedSchema::builder("i").name("a").build().unwrap())
        .build()
        .unwrap();
    let stream = export_array_stream(schema, None);
    let reader = unsafe { ArrayStreamReader::new(stream) }.unwrap();
    let first = OwnedSchema::deep_copy(reader.schema()).unwrap();
    drop(reader);
    assert_eq!(first.child(0).unwrap().name_cstr().unwrap().to_str().unwrap(), "a");
}
