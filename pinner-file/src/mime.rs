//! Content type of file parts.

use pinner_core::constants::DEFAULT_CONTENT_TYPE;

/// Guesses the media type from a file name, falling back to `application/octet-stream`.
pub fn media_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
