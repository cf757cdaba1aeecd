//! Runtime configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default user agent for preview requests
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Linux; Android 13) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Mobile Safari/537.36";

/// Paths and tunables shared by the workflows
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the cached preview image
    pub cache_dir: PathBuf,
    /// App-private directory where downloads are staged
    pub temp_dir: PathBuf,
    /// Root of the managed storage index
    pub storage_root: PathBuf,
    /// Explicit yt-dlp executable, looked up on PATH when unset
    pub ytdlp_path: Option<PathBuf>,
    /// Timeout for preview HTTP requests
    pub http_timeout: Duration,
    /// Timeout for a single extractor call (none by default)
    pub bridge_timeout: Option<Duration>,
    /// User agent for preview HTTP requests
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        let base_cache = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("webdl");
        let storage_root = dirs::home_dir()
            .map(|home| home.join("webdl-library"))
            .unwrap_or_else(|| PathBuf::from("webdl-library"));

        Self {
            cache_dir: base_cache.join("thumbnails"),
            temp_dir: base_cache.join("temp"),
            storage_root,
            ytdlp_path: None,
            http_timeout: Duration::from_secs(30),
            bridge_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Root all private and public directories under one base path
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            cache_dir: base.join("cache").join("thumbnails"),
            temp_dir: base.join("cache").join("temp"),
            storage_root: base.join("storage"),
            ..Self::default()
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_storage_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_root = dir.into();
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_bridge_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.bridge_timeout = timeout;
        self
    }
}
