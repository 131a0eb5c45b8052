//! Read-only (dry-run) store decorator.
//!
//! This module provides a store implementation that wraps other
//! implementations and prevents mutating operations from executing, but
//! indicating success on return.

use async_trait::async_trait;

use crate::{Page, RawEntry, RemoteStore, StoreHandle, error::Result};

/// Prefix of the placeholder ids handed out for folders that were never created.
const DRY_RUN_PREFIX: &str = "dry-run:";

/// Read-only store.
///
/// Wraps another store and silently drops all folder creations and moves,
/// logging an [`info event`](tracing::Event). Created folders get a
/// placeholder id so callers can keep building on top of them; listing a
/// placeholder yields an empty page.
#[derive(Clone)]
pub struct ReadOnlyStore {
    inner: StoreHandle,
}
impl ReadOnlyStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self { inner }
    }

    fn is_placeholder(id: &str) -> bool {
        id.starts_with(DRY_RUN_PREFIX)
    }
}

#[async_trait]
impl RemoteStore for ReadOnlyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<Page> {
        if Self::is_placeholder(folder_id) {
            return Ok(Page::default());
        }
        self.inner.list_children(folder_id, page_token).await
    }

    async fn get_entry(&self, entry_id: &str) -> Result<RawEntry> {
        self.inner.get_entry(entry_id).await
    }

    async fn find_folders_by_name(&self, name: &str) -> Result<Vec<RawEntry>> {
        self.inner.find_folders_by_name(name).await
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        crate::validate_name(name)?;
        tracing::info!(name, parent = parent_id, "Skipping folder creation during read-only mode");
        Ok(format!("{DRY_RUN_PREFIX}{parent_id}/{name}"))
    }

    async fn move_entry(&self, entry_id: &str, from_parent_id: &str, to_parent_id: &str) -> Result<()> {
        tracing::info!(entry = entry_id, from = from_parent_id, to = to_parent_id, "Skipping move during read-only mode");
        Ok(())
    }
}
