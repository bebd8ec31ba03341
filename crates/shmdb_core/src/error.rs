//! Error types for segment operations.

use shmdb_codec::{CodecError, ValueType};
use thiserror::Error;

/// Result type for segment operations.
pub type ShmResult<T> = Result<T, ShmError>;

/// Errors surfaced by segment operations.
///
/// The set of kinds is stable and part of the API contract; the core never
/// prints or logs, all context travels in the error value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShmError {
    /// No live entry matches the key.
    #[error("key not found")]
    NotFound,

    /// A payload, node, or buffer reservation did not fit.
    #[error("no space left in segment")]
    NoSpace,

    /// A writer was active during the lookup; the caller may retry.
    #[error("concurrent modification detected")]
    ConcurrentModification,

    /// An argument failed validation before any shared state was touched.
    #[error("invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the rejected argument.
        message: String,
    },

    /// Opening, mapping, or locking the segment failed.
    #[error("open failed: {message}")]
    OpenFailed {
        /// Description of the failure.
        message: String,
    },

    /// The calling process is not allowed to perform the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// The stored value carries a different type tag than requested.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// The tag the caller asked for.
        expected: ValueType,
        /// The tag actually stored on the node.
        actual: ValueType,
    },
}

impl ShmError {
    /// Creates an invalid-parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates an open-failed error.
    pub fn open_failed(message: impl Into<String>) -> Self {
        Self::OpenFailed {
            message: message.into(),
        }
    }

    /// Creates an open-failed error from the current OS error.
    pub fn open_failed_os(context: &str) -> Self {
        Self::OpenFailed {
            message: format!("{context}: {}", std::io::Error::last_os_error()),
        }
    }
}

impl From<CodecError> for ShmError {
    fn from(err: CodecError) -> Self {
        Self::InvalidParameter {
            message: err.to_string(),
        }
    }
}
