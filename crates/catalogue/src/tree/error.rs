//! Error types for the [`tree`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A tree error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a tree building failure.
///
/// Listing failures inside the tree never surface here: they only truncate
/// the affected subtree. These errors are about the root itself.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A store call needed to resolve the root failed.
    Storage,
    /// No folder matches the given root.
    #[display("folder not found: {_0}")]
    FolderNotFound(#[error(not(source))] String),
    /// The given root id resolves to a file.
    #[display("not a folder: {_0}")]
    NotAFolder(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
