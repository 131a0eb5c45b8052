//! Cataloguing of drive media into `YYYY/MM/DD` folders.
//!
//! [`tree::TreeBuilder`] takes a snapshot of the source and target
//! folders, and [`catalogue::catalogue`] moves each media file from the
//! source snapshot into the date folder matching its capture date.

pub mod catalogue;
mod classify;
pub mod error;
mod materialize;
mod path;
pub mod tree;

pub use crate::classify::{CaptureDate, Classification, Classifier, DateFallback, MediaPolicy};
pub use crate::materialize::materialize;
pub use crate::path::{DatePath, resolve_path};

/// Everything a cataloguing run needs besides the store and the two roots.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    /// Decides which listed entries are media and how their capture date is derived.
    pub classifier: Classifier,
    /// Maximum number of folders listed at the same time while building trees.
    pub concurrency: usize,
}
impl Default for Context {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            concurrency: 1,
        }
    }
}
