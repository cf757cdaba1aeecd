//! Private working directories: the preview cache and the download staging area

use crate::error::WebdlError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fixed name of the cached preview image
pub const THUMBNAIL_FILENAME: &str = "current_thumbnail.jpg";

/// Cache directory holding at most one preview image
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the current preview is written
    pub fn thumbnail_path(&self) -> PathBuf {
        self.dir.join(THUMBNAIL_FILENAME)
    }

    /// Create the directory if missing, otherwise delete every file in it
    pub async fn prepare(&self) -> Result<&Path, WebdlError> {
        if !tokio::fs::try_exists(&self.dir).await? {
            tokio::fs::create_dir_all(&self.dir).await?;
            return Ok(&self.dir);
        }

        let mut removed = 0usize;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        debug!("Cleared {} cached file(s) from {:?}", removed, self.dir);
        Ok(&self.dir)
    }
}

/// App-private staging directory for downloads in flight
#[derive(Debug, Clone)]
pub struct ScratchArea {
    dir: PathBuf,
}

impl ScratchArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path for `filename` inside the staging directory, creating the directory
    pub async fn path_for(&self, filename: &str) -> Result<PathBuf, WebdlError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(self.dir.join(filename))
    }

    /// Remove a staged file; a missing file is not an error
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed scratch file {:?}", path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove scratch file {:?}: {}", path, e),
        }
    }
}
