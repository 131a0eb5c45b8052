//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Entry id no longer resolves
    #[display("entry not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Transport, authentication or deadline failure talking to the store
    #[display("remote store unavailable: {_0}")]
    RemoteUnavailable(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// An entry with that name already exists (for stores that refuse to
    /// overwrite)
    #[display("entry already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// Folder or file name cannot be used as a single path segment
    #[display("invalid name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::RemoteUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("abc".to_string()).to_string(), "entry not found: abc");
        assert_eq!(ErrorKind::InvalidName("a/b".to_string()).to_string(), "invalid name: \"a/b\"");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::RemoteUnavailable("timeout".to_string()).is_retryable());
        assert!(ErrorKind::Io(IoError::other("boom")).is_retryable());
        assert!(!ErrorKind::NotFound("abc".to_string()).is_retryable());
        assert!(!ErrorKind::AlreadyExists("2022".to_string()).is_retryable());
    }
}
