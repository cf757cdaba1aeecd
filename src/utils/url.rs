//! URL utilities for user input and preview links

use crate::error::WebdlError;
use url::Url;

/// Trim user input and reject blank URLs.
///
/// Anything non-blank is passed through untouched: deciding whether a page is
/// supported is the extractor's job.
pub fn normalize_input(url: &str) -> Result<String, WebdlError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(WebdlError::EmptyUrl);
    }
    Ok(trimmed.to_string())
}

/// Parse a URL that must use the http or https scheme
pub fn parse_http_url(url: &str) -> Result<Url, WebdlError> {
    let parsed = Url::parse(url.trim())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(WebdlError::Thumbnail(format!(
            "unsupported scheme '{}' in {}",
            other, url
        ))),
    }
}

/// Host part of a URL, for log lines
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
}
