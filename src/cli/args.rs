//! Command line argument parsing

use crate::config::Config;
use crate::storage::TargetFolder;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// webdl - look up and save videos from web pages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Root of the managed storage library
    #[arg(long, global = true, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Directory for the cached preview image
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory where downloads are staged
    #[arg(long, global = true, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", global = true, value_name = "PATH")]
    pub ytdlp: Option<PathBuf>,

    /// HTTP timeout for preview images (e.g., 30s, 1m)
    #[arg(long, global = true, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Kill an extractor call after this long (no limit by default)
    #[arg(long, global = true, value_name = "DURATION")]
    pub bridge_timeout: Option<humantime::Duration>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// What to do
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up the title and preview image of a video
    Search {
        /// Page URL of the video
        url: String,
    },
    /// Download a video into the storage library
    Download {
        /// Page URL of the video
        url: String,

        /// Target folder: Downloads, Pictures, Movies or Documents
        #[arg(short, long, value_name = "NAME", default_value = "Downloads")]
        folder: String,
    },
    /// Open a saved video with the default application
    Open {
        /// Entry locator printed by `download` or `list`
        locator: String,
    },
    /// List saved entries
    List {
        /// Only list this folder
        #[arg(short, long, value_name = "NAME")]
        folder: Option<String>,
    },
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get extractor timeout as Duration
    pub fn bridge_timeout_duration(&self) -> Option<Duration> {
        self.bridge_timeout.map(Into::into)
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Build the runtime configuration, overriding defaults with given flags
    pub fn to_config(&self) -> Config {
        let mut config = Config::default()
            .with_ytdlp_path(self.ytdlp.clone())
            .with_http_timeout(self.timeout_duration())
            .with_bridge_timeout(self.bridge_timeout_duration());
        if let Some(dir) = &self.storage_root {
            config = config.with_storage_root(dir);
        }
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if let Some(dir) = &self.temp_dir {
            config = config.with_temp_dir(dir);
        }
        config
    }
}

impl Command {
    /// Target folder for `download`, falling back to Downloads for unknown names
    pub fn target_folder(&self) -> Option<TargetFolder> {
        match self {
            Command::Download { folder, .. } => Some(TargetFolder::from_name(folder)),
            Command::List {
                folder: Some(folder),
            } => Some(TargetFolder::from_name(folder)),
            _ => None,
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            command: Command::List { folder: None },
            storage_root: None,
            cache_dir: None,
            temp_dir: None,
            ytdlp: None,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            bridge_timeout: None,
            verbose: false,
            quiet: false,
        }
    }
}
