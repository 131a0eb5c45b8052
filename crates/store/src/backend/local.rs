//! Local filesystem store.
//!
//! This module provides a store implementation over a local directory, for
//! example a desktop-synced copy of a cloud drive. Entry ids are paths
//! relative to the configured root (`/`-separated), with the reserved id
//! [`ROOT_ID`] addressing the root itself. Files are accessed using
//! `tokio::fs` for async I/O.

use crate::entry::{FOLDER_TYPE, Page, ROOT_ID, RawEntry};
use crate::error::{ErrorKind, Result};
use crate::name::validate as validate_name;
use crate::RemoteStore;
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;

/// Default number of entries per listing page.
const DEFAULT_PAGE_SIZE: usize = 1000;

fn mime_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string()
}

/// Local filesystem store.
///
/// Listings are sorted by name and paginated with a numeric offset token, so
/// pagination behaves the same way a remote drive's would. Moves never
/// overwrite an existing entry.
///
/// # Examples
///
/// ```no_run
/// use pcat_store::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("drive", "/home/me/Drive").map_err(|e| e.to_string())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalStore {
    name: String,
    /// Root directory standing in for the drive's top-level container
    root: PathBuf,
    page_size: usize,
}
impl LocalStore {
    /// Create a new local filesystem store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, does not exist, or is not
    /// a directory. The root is never created on demand.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let display = root.display().to_string();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!("store root must be absolute: {display}")));
        }
        if !root.is_dir() {
            exn::bail!(ErrorKind::NotFound(display));
        }
        Ok(Self {
            name: name.into(),
            root,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Change the number of entries returned per listing page (minimum of one).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Get the absolute path for an entry id.
    ///
    /// Every segment of the id is validated, so ids can never escape the root.
    fn absolute_path(&self, id: &str) -> Result<PathBuf> {
        if id == ROOT_ID {
            return Ok(self.root.clone());
        }
        let mut path = self.root.clone();
        for segment in id.split('/') {
            path.push(validate_name(segment).map_err(|_| exn::Exn::from(ErrorKind::NotFound(id.to_string())))?);
        }
        Ok(path)
    }

    /// The id of a child named `name` inside the folder `parent_id`.
    fn child_id(parent_id: &str, name: &str) -> String {
        match parent_id {
            ROOT_ID => name.to_string(),
            parent => format!("{parent}/{name}"),
        }
    }

    /// The id of an entry's parent folder.
    fn parent_id(id: &str) -> &str {
        id.rsplit_once('/').map_or(ROOT_ID, |(parent, _)| parent)
    }

    /// Re-use same data collection from file metadata for both list and get functions
    fn entry(id: String, name: String, metadata: &Metadata) -> RawEntry {
        let mime = if metadata.is_dir() { FOLDER_TYPE.to_string() } else { mime_type(Path::new(&name)) };
        let created = metadata.created().or_else(|_| metadata.modified()).ok().map(OffsetDateTime::from);
        RawEntry {
            id,
            name,
            mime_type: mime,
            created,
            taken: None,
        }
    }

    fn map_io_error(e: std::io::Error, id: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(id.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(id.to_string()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(id.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Sorted (name, metadata) pairs of a directory's children.
    ///
    /// Entries that vanish mid-listing or aren't valid UTF-8 are dropped.
    async fn read_children(&self, folder_id: &str) -> Result<Vec<(String, Metadata)>> {
        let path = self.absolute_path(folder_id)?;
        let mut entries = fs::read_dir(&path).await.map_err(|e| Self::map_io_error(e, folder_id))?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, folder_id))? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(folder = folder_id, name = ?entry.file_name(), "Skipping entry with non-UTF-8 name");
                continue;
            };
            match entry.metadata().await {
                Ok(metadata) if metadata.is_dir() || metadata.is_file() => children.push((name, metadata)),
                // Note: silently drop what is most likely a broken symlink.
                Ok(_) => {},
                Err(e) => tracing::debug!(folder = folder_id, name, error = %e, "Skipping unreadable entry"),
            }
        }
        children.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(children)
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<Page> {
        let offset = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| exn::Exn::from(ErrorKind::BackendError(format!("invalid page token {token:?}"))))?,
        };
        let children = self.read_children(folder_id).await?;
        let total = children.len();
        let end = offset.saturating_add(self.page_size).min(total);
        let entries = children
            .into_iter()
            .skip(offset)
            .take(end.saturating_sub(offset))
            .map(|(name, metadata)| Self::entry(Self::child_id(folder_id, &name), name, &metadata))
            .collect();
        Ok(Page::new(entries, (end < total).then(|| end.to_string())))
    }

    async fn get_entry(&self, entry_id: &str) -> Result<RawEntry> {
        let path = self.absolute_path(entry_id)?;
        let metadata = fs::metadata(&path).await.map_err(|e| Self::map_io_error(e, entry_id))?;
        let name = match entry_id {
            ROOT_ID => String::new(),
            id => id.rsplit('/').next().unwrap_or(id).to_string(),
        };
        Ok(Self::entry(entry_id.to_string(), name, &metadata))
    }

    async fn find_folders_by_name(&self, name: &str) -> Result<Vec<RawEntry>> {
        Ok(self
            .read_children(ROOT_ID)
            .await?
            .into_iter()
            .filter(|(child, metadata)| metadata.is_dir() && child == name)
            .map(|(child, metadata)| Self::entry(child.clone(), child, &metadata))
            .collect())
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        let name = validate_name(name)?;
        let id = Self::child_id(parent_id, name);
        let path = self.absolute_path(parent_id)?.join(name);
        fs::create_dir(&path).await.map_err(|e| Self::map_io_error(e, &id))?;
        Ok(id)
    }

    async fn move_entry(&self, entry_id: &str, from_parent_id: &str, to_parent_id: &str) -> Result<()> {
        if entry_id == ROOT_ID || Self::parent_id(entry_id) != from_parent_id {
            exn::bail!(ErrorKind::NotFound(entry_id.to_string()));
        }
        let from = self.absolute_path(entry_id)?;
        let name = entry_id.rsplit('/').next().unwrap_or(entry_id);
        let to_id = Self::child_id(to_parent_id, name);
        let to = self.absolute_path(&to_id)?;
        if !fs::metadata(self.absolute_path(to_parent_id)?).await.map_err(|e| Self::map_io_error(e, to_parent_id))?.is_dir() {
            exn::bail!(ErrorKind::NotFound(to_parent_id.to_string()));
        }
        // `rename` silently replaces files on Unix.
        if fs::try_exists(&to).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::AlreadyExists(to_id));
        }
        fs::rename(&from, &to).await.map_err(|e| Self::map_io_error(e, entry_id))?;
        Ok(())
    }
}
