//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding typed payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The one-byte type tag is not part of the wire format.
    #[error("unknown value type tag: {tag}")]
    UnknownTag {
        /// The unrecognized tag byte.
        tag: u8,
    },

    /// The payload ended before the expected structure was complete.
    #[error("unexpected end of payload")]
    UnexpectedEof,

    /// A dictionary or object carried the same key twice.
    #[error("duplicate key in dictionary: {key:?}")]
    DuplicateKey {
        /// The offending key bytes (lossy UTF-8 for display).
        key: String,
    },

    /// A matrix buffer does not match its declared dimensions.
    #[error("matrix shape mismatch: {rows}x{cols} needs {expected} elements, got {actual}")]
    ShapeMismatch {
        /// Declared row count.
        rows: u32,
        /// Declared column count.
        cols: u32,
        /// `rows * cols`.
        expected: u64,
        /// Elements actually supplied.
        actual: usize,
    },

    /// A count or blob length does not fit the wire format's `u32` fields.
    #[error("length overflows the wire format: {message}")]
    LengthOverflow {
        /// What overflowed.
        message: String,
    },

    /// String-typed content was not valid UTF-8.
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,

    /// The payload bytes do not form a valid structure.
    #[error("malformed payload: {message}")]
    Malformed {
        /// Description of the structural problem.
        message: String,
    },
}

impl CodecError {
    /// Creates a duplicate-key error from raw key bytes.
    pub fn duplicate_key(key: &[u8]) -> Self {
        Self::DuplicateKey {
            key: String::from_utf8_lossy(key).into_owned(),
        }
    }

    /// Creates a length-overflow error.
    pub fn length_overflow(message: impl Into<String>) -> Self {
        Self::LengthOverflow {
            message: message.into(),
        }
    }

    /// Creates a malformed-payload error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
