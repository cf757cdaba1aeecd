//! Core functionality for webdl

pub mod media;
pub mod orchestrator;

pub use media::*;
pub use orchestrator::*;
