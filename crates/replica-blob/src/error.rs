//! Blob and record error types

use replica_core::CloneError;
use thiserror::Error;

/// Errors raised by blob files and record marshalling
#[derive(Debug, Error)]
pub enum BlobError {
    /// Underlying I/O failure, including a missing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An argument was rejected before any I/O happened
    #[error("InvalidArgument: `{name}` {reason}")]
    InvalidArgument {
        /// Argument name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Input does not have the size the container expects
    #[error("SizeMismatch: expected {expected} bytes, found {found}")]
    SizeMismatch {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        found: usize,
    },

    /// A byte range falls outside the buffer
    #[error("OutOfRange: {len} bytes at offset {offset} exceed buffer of {size}")]
    OutOfRange {
        /// Start of the range
        offset: usize,
        /// Length of the range
        len: usize,
        /// Buffer size
        size: usize,
    },

    /// UTF-16 input has an odd byte length
    #[error("InvalidLength: {0} bytes is not a whole number of UTF-16 units")]
    InvalidLength(usize),

    /// UTF-16 input is not well formed
    #[error("InvalidUtf16: {0}")]
    InvalidUtf16(String),

    /// A record type has a field that cannot be laid out in bytes
    #[error("UnsupportedField: {type_name}.{field}: {reason}")]
    UnsupportedField {
        /// Record type
        type_name: String,
        /// Offending field
        field: String,
        /// Why it cannot be marshalled
        reason: String,
    },

    /// A stored `char` is not a Unicode scalar value
    #[error("InvalidChar: {0:#x} is not a Unicode scalar value")]
    InvalidChar(u32),

    /// Object model or clone failure
    #[error(transparent)]
    Clone(#[from] CloneError),
}

impl BlobError {
    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported field error
    pub fn unsupported_field(
        type_name: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedField {
            type_name: type_name.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for blob operations
pub type BlobResult<T> = std::result::Result<T, BlobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BlobError::OutOfRange {
            offset: 6,
            len: 4,
            size: 8,
        };
        assert_eq!(
            err.to_string(),
            "OutOfRange: 4 bytes at offset 6 exceed buffer of 8"
        );

        let err: BlobError = CloneError::null_argument("value").into();
        assert_eq!(err.to_string(), "NullArgument: `value` must not be null");
    }
}
