//! # Error Module - Custom *ArrowVec* Error Type
//!
//! Defines the unified error type for the format parser, vector binder,
//! buffer copy engine and deep copy.
//!
//! ## Features
//! - Three categories only: invalid arguments (released or malformed structures,
//!   bad format strings, buffer-count mismatches), allocation failures, and
//!   unsupported format tokens.
//! - Each maps to an errno-style code via [`ArrowVecError::code`], so the same
//!   value can be handed back through a C boundary or recorded in a
//!   [`Status`](crate::Status).

use thiserror::Error;

/// `EINVAL`
pub const EINVAL: i32 = 22;
/// `ENOMEM`
pub const ENOMEM: i32 = 12;
/// `ENOTSUP`
pub const ENOTSUP: i32 = 95;

/// Catch all error type for `ArrowVec`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArrowVecError {
    /// Null or released structure, malformed format string, or a buffer set
    /// that does not match its declared layout.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation could not be satisfied. Treated as fatal, never retried.
    #[error("Allocation failure: could not allocate {bytes} bytes for {what}")]
    AllocationFailure { bytes: usize, what: &'static str },

    /// Unrecognised type-format token.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl ArrowVecError {
    /// Shorthand for an `InvalidArgument` error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        ArrowVecError::InvalidArgument(msg.into())
    }

    /// errno-style code for this error.
    #[inline]
    pub fn code(&self) -> i32 {
        match self {
            ArrowVecError::InvalidArgument(_) => EINVAL,
            ArrowVecError::AllocationFailure { .. } => ENOMEM,
            ArrowVecError::Unsupported(_) => ENOTSUP,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArrowVecError>;
