//! Values produced by the search and download workflows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Metadata shown as a preview after a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    /// Video title, empty when nothing was found
    pub title: String,
    /// Local path of the cached preview image
    pub thumbnail: Option<PathBuf>,
}

impl MediaMetadata {
    /// The "no result" value
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty title means no result
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
    }
}

/// Raw metadata dictionary returned by an extractor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl ResolvedMetadata {
    /// Thumbnail URL, if present and not blank
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Opaque reference to an entry of the storage index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a download run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub success: bool,
    pub locator: Option<Locator>,
}

impl DownloadResult {
    pub fn succeeded(locator: Locator) -> Self {
        Self {
            success: true,
            locator: Some(locator),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            locator: None,
        }
    }
}

/// Severity of a user-visible message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message meant for the user rather than the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
