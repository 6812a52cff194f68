use crate::types::ToolError;
use regex::Regex;

/// Normalize any accepted video reference to the canonical 11-character ID.
///
/// Accepts full watch URLs, youtu.be short links, embed and shorts paths,
/// and bare IDs. Runs before every cache lookup and upstream call since the
/// ID is the cache key.
pub fn extract(input: &str) -> Result<String, ToolError> {
    let input = input.trim();

    // Bare 11-character ID
    if Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap().is_match(input) {
        return Ok(input.to_string());
    }

    let url_patterns = [
        r"youtube\.com/watch\?[^\s]*v=([A-Za-z0-9_-]{11})",
        r"youtu\.be/([A-Za-z0-9_-]{11})",
        r"youtube\.com/embed/([A-Za-z0-9_-]{11})",
        r"youtube\.com/shorts/([A-Za-z0-9_-]{11})",
    ];
    for pattern in url_patterns {
        if let Some(caps) = Regex::new(pattern).unwrap().captures(input) {
            return Ok(caps[1].to_string());
        }
    }

    Err(ToolError::invalid_reference(input))
}
