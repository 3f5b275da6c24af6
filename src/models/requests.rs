//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Longest key the admin surface accepts.
pub const MAX_KEY_LEN: usize = 256;

/// Request body for `PUT /cache`
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds; zero or negative never expires,
///   absent uses the configured default
/// - `persistent`: Mirror the entry into the persisted tier
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub persistent: bool,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LEN {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LEN
            ));
        }
        None
    }

    /// TTL as the cache API takes it: `Some(ZERO)` for never-expiring.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
            .map(|secs| Duration::from_secs(u64::try_from(secs).unwrap_or(0)))
    }
}

/// Request body for `POST /invalidate/pattern`
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRequest {
    pub pattern: String,
}

/// Entity ids arrive as either JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

/// Request body for `POST /invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub action: String,
    #[serde(rename = "type", default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub id: Option<EntityId>,
}

/// Query string for `DELETE /cache`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearQuery {
    pub include_storage: Option<bool>,
}

impl ClearQuery {
    /// Clearing includes the persisted tier unless told otherwise.
    pub fn include_storage(&self) -> bool {
        self.include_storage.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "my-lands", "value": [1, 2]}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "my-lands");
        assert_eq!(req.value, json!([1, 2]));
        assert!(req.ttl.is_none());
        assert!(!req.persistent);
        assert_eq!(req.ttl(), None);
    }

    #[test]
    fn test_set_request_ttl_conversion() {
        let json = r#"{"key": "k", "value": 1, "ttl": 60, "persistent": true}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Some(Duration::from_secs(60)));
        assert!(req.persistent);

        let never: SetRequest = serde_json::from_str(r#"{"key":"k","value":1,"ttl":-5}"#).unwrap();
        assert_eq!(never.ttl(), Some(Duration::ZERO));
    }

    #[test]
    fn test_validate_keys() {
        let mut req = SetRequest {
            key: String::new(),
            value: json!(null),
            ttl: None,
            persistent: false,
        };
        assert!(req.validate().is_some());

        req.key = "k".repeat(MAX_KEY_LEN + 1);
        assert!(req.validate().is_some());

        req.key = "land-42".to_string();
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_invalidate_request_accepts_numeric_and_text_ids() {
        let numeric: InvalidateRequest =
            serde_json::from_str(r#"{"action":"edit","type":"land","id":42}"#).unwrap();
        assert_eq!(numeric.entity.as_deref(), Some("land"));
        assert_eq!(numeric.id.map(|id| id.to_string()), Some("42".to_string()));

        let text: InvalidateRequest =
            serde_json::from_str(r#"{"action":"delete","type":"houses","id":"h-7"}"#).unwrap();
        assert_eq!(text.id, Some(EntityId::Text("h-7".to_string())));

        let session: InvalidateRequest = serde_json::from_str(r#"{"action":"logout"}"#).unwrap();
        assert!(session.entity.is_none());
        assert!(session.id.is_none());
    }

    #[test]
    fn test_clear_query_defaults_to_both_tiers() {
        assert!(ClearQuery::default().include_storage());
        let memory_only = ClearQuery {
            include_storage: Some(false),
        };
        assert!(!memory_only.include_storage());
    }
}
