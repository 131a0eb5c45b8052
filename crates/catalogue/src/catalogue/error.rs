//! Error types for the [`catalogue`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A catalogue error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalogue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a cataloguing failure.
///
/// ### Fatal (end the run)
/// - [`ErrorKind::Tree`]
/// - [`ErrorKind::FolderNotFound`]
///
/// ### Per-file (the run continues with the next file)
/// - [`ErrorKind::CreateFolderFailed`]
/// - [`ErrorKind::IncompleteDestination`]
/// - [`ErrorKind::MoveFailed`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Resolving a root or building its snapshot tree failed.
    #[display("issue building snapshot tree")]
    Tree,
    /// The target root doesn't exist; nothing can be moved into it.
    #[display("target folder not found: {_0}")]
    FolderNotFound(#[error(not(source))] String),
    /// A destination folder couldn't be created.
    #[display("could not create folder: {_0}")]
    CreateFolderFailed(#[error(not(source))] String),
    /// Part of the destination path couldn't be listed, so whether a folder
    /// or file of the same name already exists there is unknown.
    #[display("destination folder was only partly listed: {_0}")]
    IncompleteDestination(#[error(not(source))] String),
    /// The store refused to move a file.
    #[display("could not move file: {_0}")]
    MoveFailed(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Moves and folder creation are never retried automatically: a request
    /// that timed out may still have been applied.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
