//! Default values shared across tagfeed crates.

/// Chats fetched per history page.
pub const PAGE_SIZE: usize = 20;

/// Seconds before a cache snapshot is considered stale and re-primed.
///
/// Long on purpose: writes patch the caches directly, so revalidation only
/// papers over drift from other clients.
pub const CACHE_TTL_SECS: u64 = 300;

/// Maximum tag name length in characters, after trimming.
pub const MAX_TAG_NAME_LEN: usize = 100;

/// Validate a tag name.
///
/// Rules:
/// - Non-empty after trimming
/// - At most [`MAX_TAG_NAME_LEN`] characters
///
/// Returns the trimmed name if valid, an error message otherwise.
pub fn validate_tag_name(name: &str) -> std::result::Result<&str, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_TAG_NAME_LEN {
        return Err(format!(
            "Tag name must be {} characters or less",
            MAX_TAG_NAME_LEN
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty() {
        assert!(validate_tag_name("").is_err());
        assert!(validate_tag_name("   ").is_err());
    }

    #[test]
    fn test_validate_trims() {
        assert_eq!(validate_tag_name("  work  ").unwrap(), "work");
    }

    #[test]
    fn test_validate_rejects_over_limit() {
        let long = "x".repeat(MAX_TAG_NAME_LEN + 1);
        assert!(validate_tag_name(&long).is_err());
        let ok = "x".repeat(MAX_TAG_NAME_LEN);
        assert!(validate_tag_name(&ok).is_ok());
    }
}
