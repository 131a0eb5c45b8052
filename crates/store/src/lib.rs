//! Remote store interface for the photo cataloguer.
//!
//! Everything the cataloguer knows about a cloud drive goes through the
//! [`RemoteStore`] trait: paginated folder listings, single-entry lookups,
//! top-level folder search, folder creation and moves. Concrete stores and
//! decorators live in [`backend`].

pub mod backend;
mod entry;
pub mod error;
mod name;

pub use crate::backend::RemoteStore;
pub use crate::entry::{FOLDER_TYPE, Page, ROOT_ID, RawEntry};
pub use crate::name::validate as validate_name;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn RemoteStore + Send + Sync>;
