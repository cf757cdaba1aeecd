//! Managed media storage

pub mod fs;
pub mod index;

pub use fs::*;
pub use index::*;
