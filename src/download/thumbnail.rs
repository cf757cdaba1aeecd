//! Preview image downloader

use crate::config::Config;
use crate::error::WebdlError;
use crate::utils::url::parse_http_url;
use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Downloads a single image over HTTP(S) into a local file
#[derive(Clone)]
pub struct ThumbnailFetcher {
    client: Client,
}

impl ThumbnailFetcher {
    /// Create a fetcher with default timeout and user agent
    pub fn new() -> Result<Self, WebdlError> {
        Self::with_config(&Config::default())
    }

    /// Create a fetcher using the HTTP settings of `config`
    pub fn with_config(config: &Config) -> Result<Self, WebdlError> {
        Self::build(config.http_timeout, &config.user_agent)
    }

    fn build(timeout: Duration, user_agent: &str) -> Result<Self, WebdlError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    /// Stream `url` into `destination`, replacing any existing file.
    ///
    /// Returns the number of bytes written. On failure the destination is left
    /// untouched and no partial file remains.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, WebdlError> {
        let url = parse_http_url(url)?;
        debug!("Fetching thumbnail {} -> {:?}", url, destination);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WebdlError::Thumbnail(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let part_path = destination.with_extension("part");
        match Self::write_body(response, &part_path).await {
            Ok(written) => {
                tokio::fs::rename(&part_path, destination).await?;
                debug!("Thumbnail saved: {} bytes", written);
                Ok(written)
            }
            Err(e) => {
                warn!("Thumbnail download failed: {}, cleaning up partial file", e);
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }

    async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64, WebdlError> {
        let mut file = File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}
