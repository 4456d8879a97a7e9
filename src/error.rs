//! Crate-wide error taxonomy.
//!
//! Four kinds, matching the failure policy of the archive protocol:
//!
//! - [`RecError::Io`] — the transport failed or the stream ended before the
//!   requested bytes were transferred.  The archive layer never retries a
//!   short read or write; retry policy belongs to the transport.
//! - [`RecError::Format`] — the input is malformed, truncated, or out of
//!   sequence for the active wire format.
//! - [`RecError::Encoding`] — a value cannot be represented in the active
//!   wire format (e.g. a tag that is not a legal XML element name).
//! - [`RecError::Validation`] — a record failed its own `validate()` where
//!   validation was requested before a write.
//!
//! Every error propagates synchronously to the caller of the read or write
//! that triggered it.  A failed deserialize leaves the target record
//! partially populated; callers must discard it.

use std::io;
use thiserror::Error;

use crate::archive::RecFormat;

pub type Result<T> = std::result::Result<T, RecError>;

#[derive(Error, Debug)]
pub enum RecError {
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("malformed {format} input: {reason}")]
    Format { format: RecFormat, reason: String },
    #[error("value not representable in {format}: {reason}")]
    Encoding { format: RecFormat, reason: String },
    #[error("record `{type_name}` failed validation")]
    Validation { type_name: String },
}

impl RecError {
    pub fn format(format: RecFormat, reason: impl Into<String>) -> Self {
        RecError::Format { format, reason: reason.into() }
    }

    pub fn encoding(format: RecFormat, reason: impl Into<String>) -> Self {
        RecError::Encoding { format, reason: reason.into() }
    }

    pub fn validation(type_name: impl Into<String>) -> Self {
        RecError::Validation { type_name: type_name.into() }
    }
}
