//! Extractor backed by the `yt-dlp` program

use crate::config::Config;
use crate::core::media::ResolvedMetadata;
use crate::error::WebdlError;
use crate::platform::bridge::ExtractionBridge;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Format selector passed to every call
const FORMAT: &str = "best";

/// Runs `yt-dlp` (or `python3 -m yt_dlp`) as a child process
#[derive(Debug, Clone)]
pub struct YtDlpBridge {
    program: PathBuf,
    base_args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl YtDlpBridge {
    /// Use `program` as the yt-dlp executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout: None,
        }
    }

    /// Locate yt-dlp from the configuration.
    ///
    /// An explicit path wins; otherwise `yt-dlp` is looked up on PATH, then the
    /// Python module through `python3 -m yt_dlp`.
    pub fn from_config(config: &Config) -> Result<Self, WebdlError> {
        let bridge = if let Some(path) = &config.ytdlp_path {
            let program = which::which(path)
                .map_err(|e| WebdlError::ToolNotFound(format!("{}: {}", path.display(), e)))?;
            Self::new(program)
        } else if let Ok(program) = which::which("yt-dlp") {
            Self::new(program)
        } else if let Ok(python) = which::which("python3") {
            debug!("yt-dlp not on PATH, using python module via {:?}", python);
            Self::new(python).with_base_args(["-m", "yt_dlp"])
        } else {
            return Err(WebdlError::ToolNotFound(
                "yt-dlp not found on PATH (install it or pass --yt-dlp)".to_string(),
            ));
        };
        Ok(bridge.with_timeout(config.bridge_timeout))
    }

    /// Arguments placed before every call, e.g. `-m yt_dlp`
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill a call that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn resolve_args(url: &str) -> Vec<OsString> {
        [
            "--dump-single-json",
            "--skip-download",
            "--no-playlist",
            "--no-warnings",
            "-f",
            FORMAT,
            url,
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    fn fetch_args(url: &str, destination: &Path) -> Vec<OsString> {
        // yt-dlp treats -o as a template; a literal '%' must be doubled
        let template = destination.to_string_lossy().replace('%', "%%");
        [
            "-f",
            FORMAT,
            "--no-playlist",
            "--no-part",
            "--force-overwrites",
            "--no-progress",
            "-o",
            template.as_str(),
            url,
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Output, WebdlError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("Running {:?} {:?} {:?}", self.program, self.base_args, args);

        let child = command.output();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child).await.map_err(|_| {
                WebdlError::Timeout(format!("yt-dlp did not finish within {:?}", limit))
            })?,
            None => child.await,
        };

        let output = result.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                WebdlError::ToolNotFound(format!("{}: {}", self.program.display(), e))
            } else {
                WebdlError::Io(e)
            }
        })?;

        if !output.status.success() {
            let message = stderr_tail(&output.stderr)
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            warn!("yt-dlp failed: {}", message);
            return Err(WebdlError::Bridge(message));
        }
        Ok(output)
    }
}

/// Last non-empty stderr line, where yt-dlp puts its `ERROR:` message
fn stderr_tail(stderr: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ExtractionBridge for YtDlpBridge {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve_metadata(
        &self,
        url: &str,
        thumbnail_dir: &Path,
    ) -> Result<ResolvedMetadata, WebdlError> {
        debug!("Resolving {} (thumbnail dir {:?})", url, thumbnail_dir);
        let output = self.run(Self::resolve_args(url)).await?;
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(WebdlError::Resolve("yt-dlp printed no metadata".to_string()));
        }
        let metadata: ResolvedMetadata = serde_json::from_slice(&output.stdout)?;
        info!("Resolved title: {:?}", metadata.title);
        Ok(metadata)
    }

    async fn fetch_media(&self, url: &str, destination: &Path) -> Result<(), WebdlError> {
        info!("Fetching media for {} into {:?}", url, destination);
        self.run(Self::fetch_args(url, destination)).await?;
        Ok(())
    }
}
