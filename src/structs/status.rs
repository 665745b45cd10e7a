//! # Status Module - *Reusable result record*
//!
//! A mutable `{code, message}` pair for reporting through C-shaped boundaries,
//! where a `Result` cannot travel. Code `0` is success.
//!
//! Once an error is recorded it stays until [`Status::reset`]; further
//! [`Status::record`] calls leave it untouched.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::enums::error::ArrowVecError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    code: i32,
    message: String,
}

impl Status {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears any recorded error.
    #[inline]
    pub fn reset(&mut self) {
        self.code = 0;
        self.message.clear();
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    #[inline]
    pub fn code(&self) -> i32 {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Records an error unless one is already set.
    pub fn set_error(&mut self, code: i32, message: impl Into<String>) {
        if self.is_ok() {
            self.code = code;
            self.message = message.into();
        }
    }

    /// Records `err` unless an error is already set.
    #[inline]
    pub fn set(&mut self, err: &ArrowVecError) {
        self.set_error(err.code(), err.to_string());
    }

    /// Unwraps `result`, recording the error on failure.
    pub fn record<T>(&mut self, result: Result<T, ArrowVecError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.set(&e);
                None
            }
        }
    }
}

impl From<&ArrowVecError> for Status {
    fn from(err: &ArrowVecError) -> Self {
        let mut status = Status::new();
        status.set(err);
        status
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_ok() {
            f.write_str("OK")
        } else {
            write!(f, "[{}] {}", self.code, self.message)
        }
    }
}
