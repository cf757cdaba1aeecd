//! # webdl - save web videos into a managed media library
//!
//! Resolves a page URL into a title and a cached preview image, and downloads
//! the video through an external extractor into a two-phase storage index.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webdl::{Config, FsMediaStore, Orchestrator, TargetFolder, YtDlpBridge};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let bridge = Arc::new(YtDlpBridge::from_config(&config)?);
//!     let store = Arc::new(FsMediaStore::open(&config.storage_root).await?);
//!     let orchestrator = Orchestrator::new(bridge, store, &config)?;
//!
//!     let metadata = orchestrator.search("VIDEO_URL").await;
//!     println!("Found: {}", metadata.title);
//!
//!     let result = orchestrator.download("VIDEO_URL", TargetFolder::Movies).await;
//!     println!("Saved: {}", result.success);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod download;
pub mod error;
pub mod platform;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::{DownloadResult, Locator, MediaMetadata, Notice, NoticeLevel, Orchestrator};
pub use error::{FailureKind, WebdlError};
pub use platform::{ExtractionBridge, YtDlpBridge};
pub use storage::{Collection, FsMediaStore, MediaStore, TargetFolder};
