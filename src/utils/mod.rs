//! Utility functions for webdl

pub mod filename;
pub mod url;

pub use filename::*;
pub use url::*;
