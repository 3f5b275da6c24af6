//! Wildcard key patterns.
//!
//! `*` matches any run of characters (including none and line breaks). Every
//! other character matches itself, and the pattern must cover the whole key.

use regex::Regex;

use crate::error::{CacheError, Result};

/// A compiled `*`-wildcard pattern over cache keys.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!("(?s)^{body}$")).map_err(|e| {
            CacheError::InvalidRequest(format!("invalid pattern '{pattern}': {e}"))
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_wildcard() {
        let pattern = WildcardPattern::new("land-details-*").unwrap();

        assert!(pattern.matches("land-details-1"));
        assert!(pattern.matches("land-details-"));
        assert!(!pattern.matches("house-details-1"));
        assert!(!pattern.matches("my-land-details-1"));
    }

    #[test]
    fn test_inner_and_multiple_wildcards() {
        let pattern = WildcardPattern::new("*-lands-*-6").unwrap();

        assert!(pattern.matches("available-lands-1-6"));
        assert!(pattern.matches("search-lands-beach-2-6"));
        assert!(!pattern.matches("available-lands-1-12"));
    }

    #[test]
    fn test_wildcard_spans_line_breaks() {
        let pattern = WildcardPattern::new("search-lands-*").unwrap();

        assert!(pattern.matches("search-lands-sea\nview"));
        assert!(pattern.matches("search-lands-\r\n"));
    }

    #[test]
    fn test_pattern_without_wildcard_is_exact() {
        let pattern = WildcardPattern::new("my-lands").unwrap();

        assert!(pattern.matches("my-lands"));
        assert!(!pattern.matches("my-lands-2"));
    }

    #[test]
    fn test_metacharacters_match_literally() {
        let pattern = WildcardPattern::new("search.v2-*").unwrap();

        assert!(pattern.matches("search.v2-lands"));
        assert!(!pattern.matches("searchXv2-lands"));
        assert_eq!(pattern.as_str(), "search.v2-*");
    }
}
