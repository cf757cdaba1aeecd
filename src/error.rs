//! Error types for webdl

use thiserror::Error;

/// Main error type for webdl operations
#[derive(Debug, Error)]
pub enum WebdlError {
    #[error("Please enter a video URL.")]
    EmptyUrl,

    #[error("A {0} is already in progress")]
    Busy(&'static str),

    #[error("Could not resolve video: {0}")]
    Resolve(String),

    #[error("Thumbnail download failed: {0}")]
    Thumbnail(String),

    #[error("Storage index error: {0}")]
    StorageIndex(String),

    #[error("Media download failed: {0}")]
    MediaFetch(String),

    #[error("Extractor error: {0}")]
    Bridge(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Storage database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Which step of a workflow an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rejected before any work started (blank URL, busy slot)
    Input,
    /// Bridge failed during metadata lookup
    Resolve,
    /// Preview image could not be downloaded
    Thumbnail,
    /// Insertion, stream-open or commit on the storage index failed
    StorageIndex,
    /// Bridge failed or produced nothing during a media download
    MediaFetch,
}

impl WebdlError {
    /// Classify the error by workflow step.
    ///
    /// Errors that carry no step of their own (IO, JSON, a failing tool) are
    /// attributed to the bridge side, since that is where they surface.
    pub fn kind(&self) -> FailureKind {
        match self {
            WebdlError::EmptyUrl | WebdlError::Busy(_) => FailureKind::Input,
            WebdlError::Resolve(_) | WebdlError::Json(_) => FailureKind::Resolve,
            WebdlError::Thumbnail(_) | WebdlError::Http(_) | WebdlError::Url(_) => {
                FailureKind::Thumbnail
            }
            WebdlError::StorageIndex(_) | WebdlError::Database(_) => FailureKind::StorageIndex,
            WebdlError::MediaFetch(_)
            | WebdlError::Bridge(_)
            | WebdlError::ToolNotFound(_)
            | WebdlError::Timeout(_)
            | WebdlError::Io(_) => FailureKind::MediaFetch,
        }
    }

    /// Re-label an error as a failure of workflow step `kind`.
    ///
    /// Rejections and errors already in that step are returned unchanged.
    pub fn attribute_to(self, kind: FailureKind) -> WebdlError {
        if self.kind() == kind || self.is_rejection() {
            return self;
        }
        let message = self.to_string();
        match kind {
            FailureKind::Input => self,
            FailureKind::Resolve => WebdlError::Resolve(message),
            FailureKind::Thumbnail => WebdlError::Thumbnail(message),
            FailureKind::StorageIndex => WebdlError::StorageIndex(message),
            FailureKind::MediaFetch => WebdlError::MediaFetch(message),
        }
    }

    /// Check if the error was raised before any side effect happened
    pub fn is_rejection(&self) -> bool {
        self.kind() == FailureKind::Input
    }
}
