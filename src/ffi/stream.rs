//! # Stream Module - *ArrowArrayStream export and import*
//!
//! [`export_array_stream`] wraps a schema and at most one array as a C
//! `ArrowArrayStream`. The array is handed off once; every later `get_next`
//! yields a released array, which marks the end of the stream.
//!
//! [`ArrayStreamReader`] consumes any producer's stream as an iterator of
//! [`OwnedArray`]s and releases the stream when dropped.
//!
//! Failed callbacks return an errno-style code and keep the message of the
//! failure for `get_last_error` until the next callback.

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr;

use tracing::debug;

use crate::enums::error::{ArrowVecError, EINVAL, ENOTSUP, Result};
use crate::ffi::array::OwnedArray;
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema};
use crate::ffi::schema::OwnedSchema;
use crate::structs::status::Status;

/// ArrowArrayStream as per the Arrow C stream interface
#[repr(C)]
#[derive(Debug)]
pub struct ArrowArrayStream {
    pub get_schema: Option<unsafe extern "C" fn(*mut ArrowArrayStream, *mut ArrowSchema) -> c_int>,
    pub get_next: Option<unsafe extern "C" fn(*mut ArrowArrayStream, *mut ArrowArray) -> c_int>,
    pub get_last_error: Option<unsafe extern "C" fn(*mut ArrowArrayStream) -> *const c_char>,
    pub release: Option<unsafe extern "C" fn(*mut ArrowArrayStream)>,
    pub private_data: *mut c_void,
}

impl ArrowArrayStream {
    /// Creates an empty, released stream, e.g. as an out-parameter target.
    pub fn empty() -> Self {
        Self {
            get_schema: None,
            get_next: None,
            get_last_error: None,
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }
}

struct StreamPrivate {
    schema: OwnedSchema,
    array: Option<OwnedArray>,
    status: Status,
    last_error: Option<CString>,
}

impl StreamPrivate {
    fn begin(&mut self) {
        self.status.reset();
        self.last_error = None;
    }

    fn fail(&mut self, err: &ArrowVecError) -> c_int {
        self.status.set(err);
        self.last_error = CString::new(self.status.message()).ok();
        self.status.code()
    }
}

/// Exports `schema` and, if given, a single `array` as a one-shot stream.
pub fn export_array_stream(schema: OwnedSchema, array: Option<OwnedArray>) -> ArrowArrayStream {
    let private = Box::new(StreamPrivate {
        schema,
        array,
        status: Status::new(),
        last_error: None,
    });
    ArrowArrayStream {
        get_schema: Some(stream_get_schema),
        get_next: Some(stream_get_next),
        get_last_error: Some(stream_get_last_error),
        release: Some(stream_release),
        private_data: Box::into_raw(private) as *mut c_void,
    }
}

/// # Safety
/// `stream` must be null or a live stream created by [`export_array_stream`].
unsafe fn private_of<'a>(stream: *mut ArrowArrayStream) -> Option<&'a mut StreamPrivate> {
    let stream = unsafe { stream.as_mut() }?;
    if stream.is_released() {
        return None;
    }
    unsafe { (stream.private_data as *mut StreamPrivate).as_mut() }
}

unsafe extern "C" fn stream_get_schema(stream: *mut ArrowArrayStream, out: *mut ArrowSchema) -> c_int {
    let Some(private) = (unsafe { private_of(stream) }) else {
        return EINVAL;
    };
    private.begin();
    if out.is_null() {
        return private.fail(&ArrowVecError::invalid("get_schema() called with a NULL output schema"));
    }
    match OwnedSchema::deep_copy(&private.schema) {
        Ok(schema) => {
            unsafe { schema.export_to(out) };
            0
        }
        Err(e) => private.fail(&e),
    }
}

unsafe extern "C" fn stream_get_next(stream: *mut ArrowArrayStream, out: *mut ArrowArray) -> c_int {
    let Some(private) = (unsafe { private_of(stream) }) else {
        return EINVAL;
    };
    private.begin();
    if out.is_null() {
        return private.fail(&ArrowVecError::invalid("get_next() called with a NULL output array"));
    }
    match private.array.take() {
        Some(array) => {
            debug!(length = array.length, "stream hands off its array");
            unsafe { array.export_to(out) };
        }
        None => {
            debug!("stream exhausted");
            unsafe { ptr::write(out, ArrowArray::empty()) };
        }
    }
    0
}

unsafe extern "C" fn stream_get_last_error(stream: *mut ArrowArrayStream) -> *const c_char {
    match unsafe { private_of(stream) } {
        Some(private) => private.last_error.as_ref().map_or(ptr::null(), |e| e.as_ptr()),
        None => ptr::null(),
    }
}

unsafe extern "C" fn stream_release(stream: *mut ArrowArrayStream) {
    let Some(s) = (unsafe { stream.as_mut() }) else {
        return;
    };
    if s.is_released() {
        return;
    }
    if !s.private_data.is_null() {
        drop(unsafe { Box::from_raw(s.private_data as *mut StreamPrivate) });
    }
    *s = ArrowArrayStream::empty();
}

/// Iterates the arrays of a C `ArrowArrayStream`.
pub struct ArrayStreamReader {
    stream: Box<ArrowArrayStream>,
    schema: OwnedSchema,
    finished: bool,
}

// The reader exclusively owns the stream.
unsafe impl Send for ArrayStreamReader {}

impl ArrayStreamReader {
    /// Takes ownership of the stream at `ptr`, leaving a released stream behind,
    /// and fetches its schema.
    ///
    /// # Safety
    /// `ptr` must point to a valid ArrowArrayStream that the caller owns.
    pub unsafe fn from_raw(ptr: *mut ArrowArrayStream) -> Result<Self> {
        let stream = unsafe { ptr::replace(ptr, ArrowArrayStream::empty()) };
        unsafe { Self::new(stream) }
    }

    /// Takes ownership of `stream` and fetches its schema.
    ///
    /// # Safety
    /// `stream` must honour the C stream interface contract.
    pub unsafe fn new(stream: ArrowArrayStream) -> Result<Self> {
        if stream.is_released() {
            return Err(ArrowVecError::invalid("array stream is released"));
        }
        let mut stream = Box::new(stream);
        let get_schema = stream
            .get_schema
            .ok_or_else(|| ArrowVecError::invalid("array stream has no get_schema callback"))?;
        let mut out = ArrowSchema::empty();
        let code = unsafe { get_schema(stream.as_mut(), &mut out) };
        let mut reader = Self {
            stream,
            schema: unsafe { OwnedSchema::from_raw(&mut out) },
            finished: false,
        };
        if code != 0 {
            return Err(reader.callback_error("get_schema", code));
        }
        if reader.schema.is_released() {
            return Err(ArrowVecError::invalid("get_schema() returned a released schema"));
        }
        Ok(reader)
    }

    /// Schema of every array in the stream.
    #[inline]
    pub fn schema(&self) -> &OwnedSchema {
        &self.schema
    }

    /// Message of the producer's last failure, if it reports one.
    pub fn last_error(&mut self) -> Option<String> {
        let get_last_error = self.stream.get_last_error?;
        let msg = unsafe { get_last_error(self.stream.as_mut()) };
        if msg.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned())
    }

    fn callback_error(&mut self, callback: &str, code: c_int) -> ArrowVecError {
        let msg = match self.last_error() {
            Some(e) => format!("{callback}() failed: {e} [{code}]"),
            None => format!("{callback}() failed [{code}]"),
        };
        if code == ENOTSUP {
            ArrowVecError::Unsupported(msg)
        } else {
            ArrowVecError::InvalidArgument(msg)
        }
    }

    fn next_array(&mut self) -> Result<Option<OwnedArray>> {
        let get_next = self
            .stream
            .get_next
            .ok_or_else(|| ArrowVecError::invalid("array stream has no get_next callback"))?;
        let mut out = ArrowArray::empty();
        let code = unsafe { get_next(self.stream.as_mut(), &mut out) };
        let array = unsafe { OwnedArray::from_raw(&mut out) };
        if code != 0 {
            return Err(self.callback_error("get_next", code));
        }
        if array.is_released() {
            return Ok(None);
        }
        Ok(Some(array))
    }
}

impl Iterator for ArrayStreamReader {
    type Item = Result<OwnedArray>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_array() {
            Ok(Some(array)) => Some(Ok(array)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for ArrayStreamReader {
    fn drop(&mut self) {
        if let Some(release) = self.stream.release {
            unsafe { release(self.stream.as_mut()) };
        }
    }
}
