//! Copyright © 2025 Peter Garfield Bower. All rights reserved.

//! # **ArrowVec** - *Arrow C Data Interface structural engine*
//!
//! Reads `ArrowSchema`/`ArrowArray` trees from any producer, validates them
//! against their format strings, and deep copies them into independently owned,
//! offset-free trees.
//!
//! ## Building blocks
//! - [`ArrowType`] and [`BufferLayout`]: format-string parsing and the buffer
//!   roles each type carries.
//! - [`ArrowVector`]: a schema bound to its array, with the validity bitmap
//!   resolved from the buffer count.
//! - [`copy_buffer`]: role-aware buffer copies between a source vector and an
//!   [`ArrayParts`] under construction.
//! - [`deep_copy`]: the two-phase copy of whole trees into [`OwnedSchema`] /
//!   [`OwnedArray`].
//! - `ArrowArrayStream` export and import, behind the default `stream` feature.
//!
//! ## Errors
//! Every fallible operation returns [`ArrowVecError`]. At C boundaries the error
//! is recorded into a [`Status`] instead.

pub mod enums {
    pub mod buffer_role;
    pub mod error;
    pub mod time_units;
}

pub mod structs {
    pub mod array;
    pub mod bitmask;
    pub mod buffer;
    pub mod status;
    pub mod vector;
}

pub mod ffi {
    pub mod array;
    pub mod arrow_c_ffi;
    pub mod arrow_dtype;
    #[cfg(feature = "cast_arrow")]
    pub mod arrow_interop;
    pub mod layout;
    pub mod schema;
    #[cfg(feature = "stream")]
    pub mod stream;
}

pub mod kernels {
    pub mod copy;
    pub mod deep_copy;
}

pub use enums::buffer_role::{BufferRole, BufferSet};
pub use enums::error::{ArrowVecError, Result};
pub use enums::time_units::{IntervalUnit, TimeUnit};
pub use ffi::array::OwnedArray;
pub use ffi::arrow_c_ffi::{
    ARROW_FLAG_DICTIONARY_ORDERED, ARROW_FLAG_MAP_KEYS_SORTED, ARROW_FLAG_NULLABLE, ArrowArray,
    ArrowSchema,
};
pub use ffi::arrow_dtype::{ArrowType, UnionMode};
pub use ffi::layout::{BufferLayout, ElementSize, parse_format};
pub use ffi::schema::{OwnedSchema, SchemaBuilder};
#[cfg(feature = "stream")]
pub use ffi::stream::{ArrayStreamReader, ArrowArrayStream, export_array_stream};
pub use kernels::copy::{copy_buffer, copy_buffers};
pub use kernels::deep_copy::{deep_copy, deep_copy_vector};
pub use structs::array::ArrayParts;
pub use structs::buffer::Buffer;
pub use structs::status::Status;
pub use structs::vector::ArrowVector;
