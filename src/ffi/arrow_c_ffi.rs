//! # **Arrow-C-FFI Module** - *Native node shapes of the C Data Interface*
//!
//! Defines the `#[repr(C)]` [`ArrowArray`] and [`ArrowSchema`] structs of the
//! *Apache Arrow* **C Data Interface**, read accessors over foreign nodes, and
//! the private holders + release callbacks for nodes built by this crate.
//!
//! ## Ownership
//! - A node whose `release` is `None` is released and is never dereferenced
//!   further. Every accessor path checks this first.
//! - Nodes built here keep everything they point at (C strings, metadata,
//!   buffers, pointer arrays, child nodes) in a boxed holder stored in
//!   `private_data`. The release callback drops the holder, which releases
//!   children and the dictionary first, then frees the parent's own memory,
//!   and finally marks the node released.
//! - Nodes are movable: the callbacks only use `private_data`, never the
//!   address of the struct itself.
//!
//! ## Accessors
//! Accessors on foreign nodes are safe to call on any non-released node that
//! honours the C Data Interface contract (valid, NUL-terminated strings,
//! `n_children` readable child pointers, `n_buffers` readable buffer slots).
//!
//! ## Trademark Notice
//! *Apache Arrow* is a trademark of the Apache Software Foundation, used here under
//! fair-use to implement its published interoperability standard as per
//! https://www.apache.org/foundation/marks/ .

use std::ffi::{CStr, CString, c_char, c_void};
use std::{ptr, slice};

use crate::enums::error::{ArrowVecError, Result};
use crate::structs::buffer::Buffer;

// Provides compatibility with the cross-platform `Apache Arrow` standard
// via the `C Data Interface` specification:
// https://arrow.apache.org/docs/format/CDataInterface.html

pub const ARROW_FLAG_DICTIONARY_ORDERED: i64 = 1;
pub const ARROW_FLAG_NULLABLE: i64 = 2;
pub const ARROW_FLAG_MAP_KEYS_SORTED: i64 = 4;

/// ArrowArray as per the Arrow C spec
#[repr(C)]
#[derive(Debug)]
pub struct ArrowArray {
    pub length: i64,
    pub null_count: i64,
    pub offset: i64,
    pub n_buffers: i64,
    pub n_children: i64,
    pub buffers: *mut *const c_void,
    pub children: *mut *mut ArrowArray,
    pub dictionary: *mut ArrowArray,
    pub release: Option<unsafe extern "C" fn(*mut ArrowArray)>,
    pub private_data: *mut c_void,
}

/// ArrowSchema as per the Arrow C spec
#[repr(C)]
#[derive(Debug)]
pub struct ArrowSchema {
    pub format: *const c_char,
    pub name: *const c_char,
    pub metadata: *const c_char,
    pub flags: i64,
    pub n_children: i64,
    pub children: *mut *mut ArrowSchema,
    pub dictionary: *mut ArrowSchema,
    pub release: Option<unsafe extern "C" fn(*mut ArrowSchema)>,
    pub private_data: *mut c_void,
}

impl ArrowArray {
    /// Creates an empty, released ArrowArray, e.g. as an out-parameter target.
    pub fn empty() -> Self {
        Self {
            length: 0,
            null_count: 0,
            offset: 0,
            n_buffers: 0,
            n_children: 0,
            buffers: ptr::null_mut(),
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Raw pointer held in buffer slot `slot`.
    pub fn buffer_ptr(&self, slot: usize) -> Result<*const u8> {
        check_live(self.is_released(), "array")?;
        let n = non_negative(self.n_buffers, "n_buffers")?;
        if slot >= n {
            return Err(ArrowVecError::invalid(format!(
                "buffer slot {slot} out of range for array with {n} buffers"
            )));
        }
        if self.buffers.is_null() {
            return Err(ArrowVecError::invalid("array has buffers but a null `buffers` pointer"));
        }
        // SAFETY: `buffers` holds `n_buffers` readable slots per the C interface.
        Ok(unsafe { *self.buffers.add(slot) } as *const u8)
    }

    /// Child array `i`.
    pub fn child(&self, i: usize) -> Result<&ArrowArray> {
        check_live(self.is_released(), "array")?;
        let n = non_negative(self.n_children, "n_children")?;
        // SAFETY: `children` holds `n_children` pointers per the C interface.
        unsafe { child_at(self.children, n, i, "array") }
    }

    /// Dictionary array, if any.
    pub fn dictionary_ref(&self) -> Option<&ArrowArray> {
        // SAFETY: a non-null dictionary points to a valid node per the C interface.
        unsafe { self.dictionary.as_ref() }
    }
}

impl ArrowSchema {
    /// Creates an empty, released ArrowSchema, e.g. as an out-parameter target.
    pub fn empty() -> Self {
        Self {
            format: ptr::null(),
            name: ptr::null(),
            metadata: ptr::null(),
            flags: 0,
            n_children: 0,
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// The format string.
    pub fn format_str(&self) -> Result<&str> {
        check_live(self.is_released(), "schema")?;
        if self.format.is_null() {
            return Err(ArrowVecError::invalid("schema format is NULL"));
        }
        // SAFETY: non-null format is a NUL-terminated string per the C interface.
        unsafe { CStr::from_ptr(self.format) }
            .to_str()
            .map_err(|_| ArrowVecError::invalid("schema format is not valid UTF-8"))
    }

    /// The field name, if set.
    pub fn name_cstr(&self) -> Option<&CStr> {
        if self.is_released() || self.name.is_null() {
            return None;
        }
        // SAFETY: non-null name is a NUL-terminated string per the C interface.
        Some(unsafe { CStr::from_ptr(self.name) })
    }

    /// The binary metadata blob, if set, including its length prefixes.
    ///
    /// Layout: `i32` pair count, then per pair `i32` key length, key bytes,
    /// `i32` value length, value bytes, all native endian.
    pub fn metadata_bytes(&self) -> Result<Option<&[u8]>> {
        check_live(self.is_released(), "schema")?;
        if self.metadata.is_null() {
            return Ok(None);
        }
        let base = self.metadata as *const u8;
        // SAFETY: metadata is a well-formed length-prefixed blob per the C interface;
        // each prefix is read before the bytes it covers are skipped.
        unsafe {
            let read_i32 = |at: usize| -> Result<usize> {
                let v = (base.add(at) as *const i32).read_unaligned();
                usize::try_from(v)
                    .map_err(|_| ArrowVecError::invalid(format!("negative length {v} in schema metadata")))
            };
            let n_pairs = read_i32(0)?;
            let mut pos = 4usize;
            for _ in 0..n_pairs * 2 {
                let len = read_i32(pos)?;
                pos += 4 + len;
            }
            Ok(Some(slice::from_raw_parts(base, pos)))
        }
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.flags & ARROW_FLAG_NULLABLE != 0
    }

    /// Child schema `i`.
    pub fn child(&self, i: usize) -> Result<&ArrowSchema> {
        check_live(self.is_released(), "schema")?;
        let n = non_negative(self.n_children, "n_children")?;
        // SAFETY: `children` holds `n_children` pointers per the C interface.
        unsafe { child_at(self.children, n, i, "schema") }
    }

    /// Dictionary value schema, if the field is dictionary encoded.
    pub fn dictionary_ref(&self) -> Option<&ArrowSchema> {
        // SAFETY: a non-null dictionary points to a valid node per the C interface.
        unsafe { self.dictionary.as_ref() }
    }
}

#[inline]
fn check_live(released: bool, what: &str) -> Result<()> {
    if released {
        Err(ArrowVecError::invalid(format!("`{what}` is released")))
    } else {
        Ok(())
    }
}

#[inline]
pub(crate) fn non_negative(v: i64, what: &str) -> Result<usize> {
    usize::try_from(v).map_err(|_| ArrowVecError::invalid(format!("negative {what}: {v}")))
}

/// # Safety
/// `children` must hold `n` readable pointers when `n > 0`.
unsafe fn child_at<'a, T>(children: *mut *mut T, n: usize, i: usize, what: &str) -> Result<&'a T> {
    if i >= n {
        return Err(ArrowVecError::invalid(format!(
            "child {i} out of range for {what} with {n} children"
        )));
    }
    if children.is_null() {
        return Err(ArrowVecError::invalid(format!("{what} has children but a null `children` pointer")));
    }
    let child = unsafe { *children.add(i) };
    unsafe { child.as_ref() }
        .ok_or_else(|| ArrowVecError::invalid(format!("{what} child {i} is NULL")))
}

/// Keeps everything an exported ArrowSchema points at alive.
pub(crate) struct SchemaHolder {
    format: CString,
    name: Option<CString>,
    metadata: Option<Box<[u8]>>,
    children: Vec<*mut ArrowSchema>,
    dictionary: *mut ArrowSchema,
}

/// Keeps the buffers, pointer arrays and child nodes of an exported ArrowArray alive.
pub(crate) struct ArrayHolder {
    #[allow(dead_code)] // Holds the memory behind `buffer_ptrs`
    buffers: Vec<Option<Buffer>>,
    buffer_ptrs: Vec<*const c_void>,
    children: Vec<*mut ArrowArray>,
    dictionary: *mut ArrowArray,
}

impl Drop for SchemaHolder {
    fn drop(&mut self) {
        for child in self.children.drain(..) {
            unsafe { release_boxed(child) };
        }
        unsafe { release_boxed(self.dictionary) };
    }
}

impl Drop for ArrayHolder {
    fn drop(&mut self) {
        for child in self.children.drain(..) {
            unsafe { release_boxed(child) };
        }
        unsafe { release_boxed(self.dictionary) };
    }
}

/// Nodes that carry a release callback.
pub(crate) trait Releasable {
    fn release_fn(&self) -> Option<unsafe extern "C" fn(*mut Self)>;
}

impl Releasable for ArrowSchema {
    fn release_fn(&self) -> Option<unsafe extern "C" fn(*mut Self)> {
        self.release
    }
}

impl Releasable for ArrowArray {
    fn release_fn(&self) -> Option<unsafe extern "C" fn(*mut Self)> {
        self.release
    }
}

/// Releases a node that was leaked from a `Box`, then frees the box.
/// # Safety
/// `node` must be null or come from `Box::into_raw` and not be used afterwards.
pub(crate) unsafe fn release_boxed<T: Releasable>(node: *mut T) {
    if node.is_null() {
        return;
    }
    let mut boxed = unsafe { Box::from_raw(node) };
    if let Some(release) = boxed.release_fn() {
        unsafe { release(boxed.as_mut() as *mut T) };
    }
}

/// Releases memory for an ArrowSchema built by this crate by dropping its holder
/// and zeroing the structure.
/// # Safety
/// Caller must ensure this is only called once per ArrowSchema.
unsafe extern "C" fn release_arrow_schema(s: *mut ArrowSchema) {
    if s.is_null() || (unsafe { &*s }).release.is_none() {
        return;
    }
    let _: Box<SchemaHolder> = unsafe { Box::from_raw((*s).private_data as *mut SchemaHolder) };
    unsafe { ptr::write_bytes(s, 0, 1) };
}

/// Releases memory for an ArrowArray built by this crate by dropping its holder
/// and zeroing the structure.
/// # Safety
/// Caller must ensure this is only called once per ArrowArray.
unsafe extern "C" fn release_arrow_array(arr: *mut ArrowArray) {
    if arr.is_null() || (unsafe { &*arr }).release.is_none() {
        return;
    }
    let _: Box<ArrayHolder> = unsafe { Box::from_raw((*arr).private_data as *mut ArrayHolder) };
    unsafe { ptr::write_bytes(arr, 0, 1) };
}

/// Builds an owned ArrowSchema node. Children and dictionary must be boxed,
/// live nodes; ownership moves into the new node.
pub(crate) fn build_schema(
    format: CString,
    name: Option<CString>,
    metadata: Option<Box<[u8]>>,
    flags: i64,
    children: Vec<Box<ArrowSchema>>,
    dictionary: Option<Box<ArrowSchema>>,
) -> ArrowSchema {
    let mut holder = Box::new(SchemaHolder {
        children: children.into_iter().map(Box::into_raw).collect(),
        dictionary: dictionary.map_or(ptr::null_mut(), Box::into_raw),
        format,
        name,
        metadata,
    });
    let n_children = holder.children.len() as i64;
    ArrowSchema {
        format: holder.format.as_ptr(),
        name: holder.name.as_ref().map_or(ptr::null(), |n| n.as_ptr()),
        metadata: holder
            .metadata
            .as_ref()
            .map_or(ptr::null(), |m| m.as_ptr() as *const c_char),
        flags,
        n_children,
        children: if n_children == 0 {
            ptr::null_mut()
        } else {
            holder.children.as_mut_ptr()
        },
        dictionary: holder.dictionary,
        release: Some(release_arrow_schema),
        private_data: Box::into_raw(holder) as *mut c_void,
    }
}

/// Builds an owned ArrowArray node from its parts. A `None` buffer is exported as
/// a null slot. Children and dictionary ownership moves into the new node.
pub(crate) fn build_array(
    length: i64,
    null_count: i64,
    offset: i64,
    buffers: Vec<Option<Buffer>>,
    children: Vec<Box<ArrowArray>>,
    dictionary: Option<Box<ArrowArray>>,
) -> ArrowArray {
    let buffer_ptrs = buffers
        .iter()
        .map(|b| b.as_ref().map_or(ptr::null(), |b| b.as_ptr() as *const c_void))
        .collect();
    let mut holder = Box::new(ArrayHolder {
        buffers,
        buffer_ptrs,
        children: children.into_iter().map(Box::into_raw).collect(),
        dictionary: dictionary.map_or(ptr::null_mut(), Box::into_raw),
    });
    let n_buffers = holder.buffer_ptrs.len() as i64;
    let n_children = holder.children.len() as i64;
    ArrowArray {
        length,
        null_count,
        offset,
        n_buffers,
        n_children,
        buffers: if n_buffers == 0 {
            ptr::null_mut()
        } else {
            holder.buffer_ptrs.as_mut_ptr()
        },
        children: if n_children == 0 {
            ptr::null_mut()
        } else {
            holder.children.as_mut_ptr()
        },
        dictionary: holder.dictionary,
        release: Some(release_arrow_array),
        private_data: Box::into_raw(holder) as *mut c_void,
    }
}

// Arrow C Data Interface basic tests
// Ownership round trips are under `ffi::schema` and `ffi::array`.

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(format: &str) -> Box<ArrowSchema> {
        Box::new(build_schema(
            CString::new(format).unwrap(),
            None,
            None,
            0,
            vec![],
            None,
        ))
    }

    #[test]
    fn test_empty_nodes_are_released() {
        assert!(ArrowArray::empty().is_released());
        let s = ArrowSchema::empty();
        assert!(s.is_released());
        assert!(s.format_str().is_err());
        assert!(s.name_cstr().is_none());
    }

    #[test]
    fn test_build_schema_accessors() {
        let mut meta = Vec::new();
        meta.extend_from_slice(&1i32.to_ne_bytes());
        meta.extend_from_slice(&3i32.to_ne_bytes());
        meta.extend_from_slice(b"key");
        meta.extend_from_slice(&2i32.to_ne_bytes());
        meta.extend_from_slice(b"v1");
        let expected_len = meta.len();

        let mut s = build_schema(
            CString::new("+s").unwrap(),
            Some(CString::new("root").unwrap()),
            Some(meta.into_boxed_slice()),
            ARROW_FLAG_NULLABLE,
            vec![leaf("i"), leaf("u")],
            None,
        );
        assert_eq!(s.format_str().unwrap(), "+s");
        assert_eq!(s.name_cstr().unwrap().to_str().unwrap(), "root");
        assert!(s.is_nullable());
        assert_eq!(s.metadata_bytes().unwrap().unwrap().len(), expected_len);
        assert_eq!(s.child(1).unwrap().format_str().unwrap(), "u");
        assert!(s.child(2).is_err());
        assert!(s.dictionary_ref().is_none());

        unsafe { (s.release.unwrap())(&mut s) };
        assert!(s.is_released());
        assert!(s.child(0).is_err());
    }

    #[test]
    fn test_build_array_accessors() {
        let child = Box::new(build_array(
            2,
            0,
            0,
            vec![None, Some(Buffer::from_values(&[7i32, 8]))],
            vec![],
            None,
        ));
        let mut a = build_array(2, 0, 0, vec![None], vec![child], None);
        assert_eq!(a.n_buffers, 1);
        assert!(a.buffer_ptr(0).unwrap().is_null());
        assert!(a.buffer_ptr(1).is_err());
        let c = a.child(0).unwrap();
        let data = c.buffer_ptr(1).unwrap() as *const i32;
        assert_eq!(unsafe { *data.add(1) }, 8);

        unsafe { (a.release.unwrap())(&mut a) };
        assert!(a.is_released());
        assert!(a.buffer_ptr(0).is_err());
    }
}
