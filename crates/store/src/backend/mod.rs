//! Remote store trait and implementations.
//!
//! This module defines the `RemoteStore` trait, the capability set the
//! cataloguer needs from a hierarchical drive: paginated listing, lookups,
//! folder creation and moves. Implementations and decorators:
//!
//! - [`LocalStore`]: a directory on the local filesystem treated as a drive.
//! - [`MockStore`]: in-memory, for tests (`mock` feature).
//! - [`ReadOnlyStore`]: dry-run decorator, mutations are logged and skipped.
//! - [`GuardedStore`]: deadlines, retries and a concurrency limit.

mod guard;
mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::guard::{GuardedStore, RetryPolicy};
pub use self::local::LocalStore;
#[cfg(feature = "mock")]
pub use self::mock::{Call, MockStore, Operation};
pub use self::ro::ReadOnlyStore;
use crate::entry::{Page, RawEntry};
use crate::error::Result;
use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub type RawEntryStream<'a> = Pin<Box<dyn Stream<Item = Result<RawEntry>> + Send + 'a>>;

/// Unified interface for remote stores.
///
/// All operations are asynchronous so network-backed stores can be plugged
/// in without blocking the runtime. Ids are opaque strings; the reserved id
/// [`ROOT_ID`](crate::ROOT_ID) always addresses the store's top-level
/// container.
///
/// # Examples
///
/// ```
/// use pcat_store::{RemoteStore, error::Result};
///
/// async fn count_top_level(store: &dyn RemoteStore) -> Result<usize> {
///     Ok(store.list_all_children(pcat_store::ROOT_ID).await?.len())
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// List a single page of a folder's direct children.
    ///
    /// Pass `None` for the first page, then the
    /// [`next_page_token`](crate::Page::next_page_token) of the previous
    /// response until the store returns none. Returns
    /// [`RemoteUnavailable`](crate::error::ErrorKind::RemoteUnavailable) on
    /// transport errors and [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if the folder does not exist.
    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<Page>;

    /// Stream every direct child of a folder, following page tokens.
    ///
    /// Pages are fetched strictly in sequence (each token depends on the
    /// previous response). The stream ends after the first error; entries
    /// yielded before it are still valid. A store that hands back the token
    /// it was just given is treated as finished rather than looping forever.
    fn children_stream<'a>(&'a self, folder_id: &'a str) -> RawEntryStream<'a> {
        Box::pin(stream! {
            let mut token: Option<String> = None;
            loop {
                let page = match self.list_children(folder_id, token.as_deref()).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        break;
                    },
                };
                let next = page.next_token().map(str::to_string);
                for entry in page.entries {
                    yield Ok(entry);
                }
                match next {
                    Some(next) if token.as_deref() == Some(next.as_str()) => {
                        tracing::warn!(store = self.name(), folder = folder_id, token = %next, "Store repeated a page token; stopping listing");
                        break;
                    },
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
        })
    }

    /// Collect every direct child of a folder into a [`Vec`].
    ///
    /// Convenience wrapper around [`children_stream()`](Self::children_stream);
    /// fails on the first listing error.
    async fn list_all_children(&self, folder_id: &str) -> Result<Vec<RawEntry>> {
        self.children_stream(folder_id).try_collect().await
    }

    /// Fetch a single entry with its metadata.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the id no
    /// longer resolves.
    async fn get_entry(&self, entry_id: &str) -> Result<RawEntry>;

    /// Find top-level folders (direct children of the root) with exactly
    /// this name. May return zero, one or several matches.
    async fn find_folders_by_name(&self, name: &str) -> Result<Vec<RawEntry>>;

    /// Create a folder named `name` under `parent_id`, returning the new id.
    ///
    /// # Notes
    /// - Not idempotent: some stores allow several folders with one name.
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;

    /// Move an entry from one folder to another.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the entry
    /// is not (or no longer) a child of `from_parent_id`.
    async fn move_entry(&self, entry_id: &str, from_parent_id: &str, to_parent_id: &str) -> Result<()>;
}
