//! Managed storage index: collections, folder mapping and the two-phase commit

use crate::core::media::Locator;
use crate::error::WebdlError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::io::AsyncWrite;

/// MIME type of every saved video
pub const VIDEO_MIME: &str = "video/mp4";

/// Sub-folder created under each public directory
pub const APP_SUBFOLDER: &str = "Downloader";

/// Public folder a user can pick as download target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetFolder {
    #[default]
    Downloads,
    Pictures,
    Movies,
    Documents,
}

impl TargetFolder {
    /// All folders, in menu order
    pub fn all() -> [TargetFolder; 4] {
        [
            TargetFolder::Downloads,
            TargetFolder::Pictures,
            TargetFolder::Movies,
            TargetFolder::Documents,
        ]
    }

    /// Parse a folder name. Unknown names fall back to `Downloads`.
    pub fn from_name(name: &str) -> TargetFolder {
        match name.trim().to_lowercase().as_str() {
            "pictures" => TargetFolder::Pictures,
            "movies" => TargetFolder::Movies,
            "documents" => TargetFolder::Documents,
            _ => TargetFolder::Downloads,
        }
    }

    /// Storage collection backing this folder
    pub fn collection(&self) -> Collection {
        match self {
            TargetFolder::Downloads => Collection::Downloads,
            TargetFolder::Pictures => Collection::Images,
            TargetFolder::Movies => Collection::Video,
            TargetFolder::Documents => Collection::Files,
        }
    }

    /// Relative path inside the collection, always ending in `/`
    pub fn relative_path(&self) -> String {
        let top = match self {
            TargetFolder::Downloads => "Download",
            TargetFolder::Pictures => "Pictures",
            TargetFolder::Movies => "Movies",
            TargetFolder::Documents => "Documents",
        };
        format!("{}/{}/", top, APP_SUBFOLDER)
    }
}

impl fmt::Display for TargetFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetFolder::Downloads => "Downloads",
            TargetFolder::Pictures => "Pictures",
            TargetFolder::Movies => "Movies",
            TargetFolder::Documents => "Documents",
        };
        f.write_str(name)
    }
}

/// Logical collection of the storage index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Downloads,
    Images,
    Video,
    Files,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Downloads => "downloads",
            Collection::Images => "images",
            Collection::Video => "video",
            Collection::Files => "files",
        }
    }

    /// Inverse of [`Collection::as_str`]
    pub fn parse(name: &str) -> Option<Collection> {
        [
            Collection::Downloads,
            Collection::Images,
            Collection::Video,
            Collection::Files,
        ]
        .into_iter()
        .find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes stored with an index entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAttributes {
    pub display_name: String,
    pub mime_type: String,
    pub relative_path: String,
    /// Pending entries are not visible to other apps yet
    pub pending: bool,
}

impl EntryAttributes {
    /// Attributes of a not-yet-visible video in `folder`
    pub fn pending_video(display_name: impl Into<String>, folder: TargetFolder) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: VIDEO_MIME.to_string(),
            relative_path: folder.relative_path(),
            pending: true,
        }
    }
}

/// A row of the storage index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub locator: Locator,
    pub collection: Collection,
    #[serde(flatten)]
    pub attributes: EntryAttributes,
    pub created_at: DateTime<Utc>,
}

impl MediaEntry {
    pub fn is_pending(&self) -> bool {
        self.attributes.pending
    }
}

/// Writer handed out for an entry's content
pub type ContentWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Platform store for user-visible media.
///
/// Content is committed in two phases: an entry is created pending, written,
/// then finalized. A pending entry that will never be finalized is aborted.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Insert a new entry and return its locator
    async fn create_pending(
        &self,
        collection: Collection,
        attributes: EntryAttributes,
    ) -> Result<Locator, WebdlError>;

    /// Open a writer for the entry's content, truncating it
    async fn open_output(&self, locator: &Locator) -> Result<ContentWriter, WebdlError>;

    /// Clear the pending flag, making the entry visible
    async fn finalize(&self, locator: &Locator) -> Result<(), WebdlError>;

    /// Delete a pending entry together with its content
    async fn abort(&self, locator: &Locator) -> Result<(), WebdlError>;

    /// List the entries of a collection, pending ones included
    async fn entries(&self, collection: Collection) -> Result<Vec<MediaEntry>, WebdlError>;

    /// Local path of a finalized entry's content
    async fn content_path(&self, locator: &Locator) -> Option<PathBuf>;
}
