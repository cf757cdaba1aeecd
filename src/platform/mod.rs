//! Extractor integration

pub mod bridge;
pub mod ytdlp;

pub use bridge::*;
pub use ytdlp::*;
