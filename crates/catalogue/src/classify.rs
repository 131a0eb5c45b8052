//! Entry classification and capture-date extraction.
//!
//! Every listed entry is either a folder to descend into, a media file to
//! catalogue, or something to ignore. Which MIME types count as media, and
//! whether a general creation timestamp may stand in for a missing "date
//! taken", are deployment choices captured by [`MediaPolicy`] and
//! [`DateFallback`].

use pcat_store::RawEntry;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// The date/time a photo or video was captured, exactly as recorded.
///
/// No timezone conversion is ever applied: a timestamp with an offset keeps
/// its own wall-clock date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureDate(PrimitiveDateTime);
impl CaptureDate {
    pub fn date(&self) -> Date {
        self.0.date()
    }
}
impl From<PrimitiveDateTime> for CaptureDate {
    fn from(value: PrimitiveDateTime) -> Self {
        Self(value)
    }
}
impl From<OffsetDateTime> for CaptureDate {
    fn from(value: OffsetDateTime) -> Self {
        Self(PrimitiveDateTime::new(value.date(), value.time()))
    }
}

/// Which MIME type families are catalogued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(rename_all = "kebab-case"))]
pub enum MediaPolicy {
    /// Only `image/*`.
    Images,
    /// `image/*` and `video/*`.
    #[default]
    ImagesAndVideos,
}

/// What to use when an entry has no embedded "date taken".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(rename_all = "kebab-case"))]
pub enum DateFallback {
    /// Fall back to the entry's general creation timestamp.
    #[default]
    Created,
    /// Leave the file uncatalogued.
    #[cfg_attr(feature = "serde", serde(rename = "none"))]
    Skip,
}

/// The outcome of classifying a single listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Folder,
    /// A media file; `None` when no capture date could be derived, in which
    /// case the file is never moved.
    Media(Option<CaptureDate>),
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classifier {
    pub media: MediaPolicy,
    pub fallback: DateFallback,
}
impl Classifier {
    pub fn new(media: MediaPolicy, fallback: DateFallback) -> Self {
        Self { media, fallback }
    }

    pub fn classify(&self, raw: &RawEntry) -> Classification {
        if raw.is_folder() {
            Classification::Folder
        } else if self.is_media(&raw.mime_type) {
            Classification::Media(self.capture_date(raw))
        } else {
            Classification::Ignored
        }
    }

    fn is_media(&self, mime_type: &str) -> bool {
        let family = mime_type.split_once('/').map(|(family, _)| family.to_ascii_lowercase());
        match (family.as_deref(), self.media) {
            (Some("image"), _) => true,
            (Some("video"), MediaPolicy::ImagesAndVideos) => true,
            _ => false,
        }
    }

    fn capture_date(&self, raw: &RawEntry) -> Option<CaptureDate> {
        match (raw.taken, raw.created, self.fallback) {
            (Some(taken), _, _) => Some(taken.into()),
            (None, Some(created), DateFallback::Created) => Some(created.into()),
            _ => None,
        }
    }
}
