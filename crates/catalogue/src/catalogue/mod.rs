//! Moving media into date-based folders.
//!
//! The primary entry point is [`catalogue`], which snapshots the source and
//! target hierarchies once, then streams an [`Action`] (or a per-file error)
//! for every media file found under the source. Each file with a capture date
//! ends up in `<target>/YYYY/MM/DD`, with missing folders created on the way.
//!
//! Nothing is ever overwritten: a file whose name is already taken in its
//! destination folder is left where it is. Moves happen one at a time, so
//! every collision check sees the result of every move before it.

pub mod error;
mod file;
mod stream;

pub use self::file::{Action, catalogue_file};
pub use self::stream::{CatalogueEvent, Summary, TreeRole, catalogue};
