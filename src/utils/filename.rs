//! Filename generation and validation

use chrono::Utc;
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

/// Prefix of generated media filenames
pub const MEDIA_PREFIX: &str = "video";

/// Last timestamp handed out by [`timestamped_filename`]
static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("static regex"))
}

/// Millisecond timestamp, strictly increasing within this process.
///
/// Two calls in the same millisecond get consecutive values.
pub fn unique_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Build `<prefix>_<epoch-millis>.<ext>`, e.g. `video_1718000000000.mp4`
pub fn timestamped_filename(prefix: &str, extension: &str) -> String {
    let ext = extension.trim_start_matches('.');
    format!("{}_{}.{}", prefix, unique_millis(), ext)
}

/// Check if a filename can be used as a single path component
pub fn is_safe_filename(filename: &str) -> bool {
    if filename.is_empty() || filename.len() > 255 {
        return false;
    }

    if invalid_chars().is_match(filename) {
        return false;
    }

    let reserved_names = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    if let Some(name_str) = Path::new(filename).file_stem().and_then(|s| s.to_str()) {
        if reserved_names.contains(&name_str.to_uppercase().as_str()) {
            return false;
        }
    }

    !(filename.starts_with('.')
        || filename.ends_with('.')
        || filename.starts_with(' ')
        || filename.ends_with(' '))
}
