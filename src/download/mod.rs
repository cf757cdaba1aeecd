//! Local file handling for downloads

pub mod scratch;
pub mod thumbnail;

pub use scratch::*;
pub use thumbnail::*;
