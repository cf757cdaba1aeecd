//! Interface to the external extractor

use crate::core::media::ResolvedMetadata;
use crate::error::WebdlError;
use async_trait::async_trait;
use std::path::Path;

/// Turns a page URL into metadata or a downloaded media file.
///
/// Site support, stream selection and the transfer itself all live behind this
/// trait. Implementations must not panic on malformed input; unsupported or
/// unreachable URLs surface as errors.
#[async_trait]
pub trait ExtractionBridge: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Look up title and thumbnail URL without downloading.
    ///
    /// `thumbnail_dir` is the cache directory the caller has just cleared.
    async fn resolve_metadata(
        &self,
        url: &str,
        thumbnail_dir: &Path,
    ) -> Result<ResolvedMetadata, WebdlError>;

    /// Write a complete, playable media file to `destination`
    async fn fetch_media(&self, url: &str, destination: &Path) -> Result<(), WebdlError>;
}
