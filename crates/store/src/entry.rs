//! Raw listing models.
//!
//! These are the shapes every store normalizes its own listing format into
//! before the cataloguer sees them.

use time::{OffsetDateTime, PrimitiveDateTime};

/// Reserved id of the store's top-level container.
pub const ROOT_ID: &str = "root";
/// Type marker stores use for folders in [`RawEntry::mime_type`].
pub const FOLDER_TYPE: &str = "inode/directory";

/// A single item as reported by a store listing or lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Opaque identifier, unique per remote item
    pub id: String,
    /// Display name, not guaranteed unique within a folder
    pub name: String,
    /// [`FOLDER_TYPE`] for folders, otherwise a MIME-like type string
    pub mime_type: String,
    /// General creation timestamp
    pub created: Option<OffsetDateTime>,
    /// Embedded "date taken" for photos and videos, as recorded (no offset)
    pub taken: Option<PrimitiveDateTime>,
}
impl RawEntry {
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::file(id, name, FOLDER_TYPE)
    }

    pub fn file(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            created: None,
            taken: None,
        }
    }

    pub fn with_created(mut self, created: OffsetDateTime) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_taken(mut self, taken: PrimitiveDateTime) -> Self {
        self.taken = Some(taken);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_TYPE
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<RawEntry>,
    /// Token to pass to the next `list_children` call; `None` (or empty) on
    /// the last page.
    pub next_page_token: Option<String>,
}
impl Page {
    pub fn new(entries: Vec<RawEntry>, next_page_token: Option<String>) -> Self {
        Self { entries, next_page_token }
    }

    /// The token for the next page, treating an empty string as "no more pages".
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}
