//! # Schema Module - *Owned ArrowSchema trees*
//!
//! [`OwnedSchema`] is the owned handle for an `ArrowSchema` node: dropping it
//! invokes the node's release callback exactly once, unless ownership was moved
//! out first via [`OwnedSchema::into_raw`] or [`OwnedSchema::export_to`].
//!
//! Also provides [`SchemaBuilder`] for constructing trees from Rust, and
//! [`OwnedSchema::deep_copy`], the first step of a deep copy: an independently
//! owned duplicate of a schema tree.

use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr;

use crate::enums::error::{ArrowVecError, Result};
use crate::ffi::arrow_c_ffi::{ARROW_FLAG_NULLABLE, ArrowSchema, build_schema, non_negative};
use crate::ffi::arrow_dtype::ArrowType;

/// Owned `ArrowSchema` node.
#[derive(Debug)]
pub struct OwnedSchema(Box<ArrowSchema>);

// The node exclusively owns its holder and children.
unsafe impl Send for OwnedSchema {}

impl OwnedSchema {
    /// Starts building a schema with the given format string.
    #[inline]
    pub fn builder(format: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(format)
    }

    /// Starts building a schema for `dtype`.
    #[inline]
    pub fn builder_for(dtype: &ArrowType) -> SchemaBuilder {
        SchemaBuilder::new(dtype.format_string())
    }

    /// Takes ownership of the node at `ptr`, leaving a released node behind.
    ///
    /// # Safety
    /// `ptr` must point to a valid ArrowSchema that the caller owns.
    pub unsafe fn from_raw(ptr: *mut ArrowSchema) -> Self {
        let node = unsafe { ptr::replace(ptr, ArrowSchema::empty()) };
        OwnedSchema(Box::new(node))
    }

    /// Gives up ownership. The caller must eventually release the node and free the box.
    pub fn into_raw(self) -> *mut ArrowSchema {
        Box::into_raw(self.into_box())
    }

    /// Moves the node into `out`. The consumer becomes responsible for releasing it.
    ///
    /// # Safety
    /// `out` must be valid for writes; any node already there is overwritten, not released.
    pub unsafe fn export_to(self, out: *mut ArrowSchema) {
        let node = *self.into_box();
        unsafe { ptr::write(out, node) };
    }

    pub(crate) fn into_box(self) -> Box<ArrowSchema> {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never dropped, so the box is moved out exactly once.
        unsafe { ptr::read(&me.0) }
    }

    /// Recursively duplicates format, name, metadata, flags, children and
    /// dictionary into an independently owned tree.
    pub fn deep_copy(src: &ArrowSchema) -> Result<Self> {
        let format = owned_cstring(src.format_str()?)?;
        let name = src.name_cstr().map(CStr::to_owned);
        let metadata = src.metadata_bytes()?.map(|m| m.to_vec().into_boxed_slice());

        let n_children = non_negative(src.n_children, "n_children")?;
        let children = (0..n_children)
            .map(|i| OwnedSchema::deep_copy(src.child(i)?))
            .collect::<Result<Vec<_>>>()?;
        let dictionary = src
            .dictionary_ref()
            .map(OwnedSchema::deep_copy)
            .transpose()?;

        Ok(OwnedSchema(Box::new(build_schema(
            format,
            name,
            metadata,
            src.flags,
            children.into_iter().map(OwnedSchema::into_box).collect(),
            dictionary.map(OwnedSchema::into_box),
        ))))
    }

    /// Decoded key/value metadata pairs.
    pub fn metadata(&self) -> Result<Vec<(String, String)>> {
        match self.metadata_bytes()? {
            Some(bytes) => decode_metadata(bytes),
            None => Ok(Vec::new()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name_cstr().and_then(|n| n.to_str().ok())
    }
}

impl Deref for OwnedSchema {
    type Target = ArrowSchema;

    fn deref(&self) -> &ArrowSchema {
        &self.0
    }
}

impl Drop for OwnedSchema {
    fn drop(&mut self) {
        if let Some(release) = self.0.release {
            unsafe { release(self.0.as_mut() as *mut ArrowSchema) };
        }
    }
}

/// Builder for [`OwnedSchema`] trees.
#[derive(Debug)]
pub struct SchemaBuilder {
    format: String,
    name: Option<String>,
    flags: i64,
    metadata: Vec<(String, String)>,
    children: Vec<OwnedSchema>,
    dictionary: Option<OwnedSchema>,
}

impl SchemaBuilder {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            name: None,
            flags: 0,
            metadata: Vec::new(),
            children: Vec::new(),
            dictionary: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn flags(mut self, flags: i64) -> Self {
        self.flags = flags;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        if nullable {
            self.flags |= ARROW_FLAG_NULLABLE;
        } else {
            self.flags &= !ARROW_FLAG_NULLABLE;
        }
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn child(mut self, child: OwnedSchema) -> Self {
        self.children.push(child);
        self
    }

    pub fn dictionary(mut self, dictionary: OwnedSchema) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Builds the node. The format string is stored verbatim; it is validated
    /// when the schema is bound.
    pub fn build(self) -> Result<OwnedSchema> {
        let format = owned_cstring(&self.format)?;
        let name = self.name.as_deref().map(owned_cstring).transpose()?;
        let metadata = if self.metadata.is_empty() {
            None
        } else {
            Some(encode_metadata(&self.metadata)?)
        };
        Ok(OwnedSchema(Box::new(build_schema(
            format,
            name,
            metadata,
            self.flags,
            self.children.into_iter().map(OwnedSchema::into_box).collect(),
            self.dictionary.map(OwnedSchema::into_box),
        ))))
    }
}

fn owned_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| ArrowVecError::invalid(format!("string {s:?} contains a NUL byte")))
}

fn encode_metadata(pairs: &[(String, String)]) -> Result<Box<[u8]>> {
    let len_i32 = |n: usize| {
        i32::try_from(n).map_err(|_| ArrowVecError::invalid(format!("metadata length {n} exceeds i32")))
    };
    let mut out = Vec::new();
    out.extend_from_slice(&len_i32(pairs.len())?.to_ne_bytes());
    for (k, v) in pairs {
        out.extend_from_slice(&len_i32(k.len())?.to_ne_bytes());
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(&len_i32(v.len())?.to_ne_bytes());
        out.extend_from_slice(v.as_bytes());
    }
    Ok(out.into_boxed_slice())
}

/// Decodes a length-prefixed metadata blob into key/value pairs.
pub fn decode_metadata(bytes: &[u8]) -> Result<Vec<(String, String)>> {
    let mut cursor = MetadataCursor { bytes, pos: 0 };
    let n_pairs = cursor.read_len()?;
    let mut pairs = Vec::with_capacity(n_pairs.min(bytes.len() / 8));
    for _ in 0..n_pairs {
        let k = cursor.read_str()?;
        let v = cursor.read_str()?;
        pairs.push((k, v));
    }
    Ok(pairs)
}

struct MetadataCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> MetadataCursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.bytes.len())
            .ok_or_else(|| ArrowVecError::invalid("schema metadata is truncated"))?;
        let s = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn read_len(&mut self) -> Result<usize> {
        let raw = self.take(4)?;
        let v = i32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]);
        usize::try_from(v)
            .map_err(|_| ArrowVecError::invalid(format!("negative length {v} in schema metadata")))
    }

    fn read_str(&mut self) -> Result<String> {
        let n = self.read_len()?;
        Ok(String::from_utf8_lossy(self.take(n)?).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::arrow_c_ffi::ARROW_FLAG_DICTIONARY_ORDERED;

    fn sample_tree() -> OwnedSchema {
        let values = OwnedSchema::builder("u").name("values").build().unwrap();
        let codes = OwnedSchema::builder("i")
            .name("codes")
            .flags(ARROW_FLAG_DICTIONARY_ORDERED)
            .dictionary(values)
            .build()
            .unwrap();
        let item = OwnedSchema::builder_for(&ArrowType::Float64)
            .name("item")
            .nullable(true)
            .build()
            .unwrap();
        let list = OwnedSchema::builder("+l").name("list").child(item).build().unwrap();
        OwnedSchema::builder("+s")
            .name("root")
            .metadata("origin", "unit-test")
            .metadata("k", "")
            .child(codes)
            .child(list)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_tree() {
        let s = sample_tree();
        assert_eq!(s.format_str().unwrap(), "+s");
        assert_eq!(s.name(), Some("root"));
        assert_eq!(s.n_children, 2);
        assert_eq!(
            s.metadata().unwrap(),
            vec![("origin".to_string(), "unit-test".to_string()), ("k".to_string(), String::new())]
        );
        let codes = s.child(0).unwrap();
        assert_eq!(codes.dictionary_ref().unwrap().format_str().unwrap(), "u");
        let item = s.child(1).unwrap().child(0).unwrap();
        assert_eq!(item.format_str().unwrap(), "g");
        assert!(item.is_nullable());
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let src = sample_tree();
        let copy = OwnedSchema::deep_copy(&src).unwrap();
        drop(src);

        assert_eq!(copy.format_str().unwrap(), "+s");
        assert_eq!(copy.name(), Some("root"));
        assert_eq!(copy.metadata().unwrap().len(), 2);
        let codes = copy.child(0).unwrap();
        assert_eq!(codes.flags, ARROW_FLAG_DICTIONARY_ORDERED);
        assert_eq!(codes.name_cstr().unwrap().to_str().unwrap(), "codes");
        assert_eq!(codes.dictionary_ref().unwrap().format_str().unwrap(), "u");
        assert_eq!(copy.child(1).unwrap().child(0).unwrap().format_str().unwrap(), "g");
    }

    #[test]
    fn test_deep_copy_released_fails() {
        let empty = ArrowSchema::empty();
        let err = OwnedSchema::deep_copy(&empty).unwrap_err();
        assert_eq!(err, ArrowVecError::invalid("`schema` is released"));
    }

    #[test]
    fn test_raw_roundtrip_and_export() {
        let s = sample_tree();
        let raw = s.into_raw();
        let back = unsafe { OwnedSchema::from_raw(raw) };
        // `from_raw` left a released node in the original box.
        assert!(unsafe { (*raw).is_released() });
        unsafe { drop(Box::from_raw(raw)) };

        let mut out = ArrowSchema::empty();
        unsafe { back.export_to(&mut out) };
        assert_eq!(out.format_str().unwrap(), "+s");
        let owned = unsafe { OwnedSchema::from_raw(&mut out) };
        assert!(out.is_released());
        drop(owned);
    }

    #[test]
    fn test_builder_rejects_nul() {
        assert!(OwnedSchema::builder("i\0").build().is_err());
    }

    #[test]
    fn test_decode_metadata_truncated() {
        let bytes = 1i32.to_ne_bytes();
        assert!(decode_metadata(&bytes).is_err());
    }
}
