//! Error types for the listing cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the listing cache.
///
/// Only [`CacheError::Producer`] ever leaves the cache API; persistence
/// failures are absorbed at the store boundary.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The value producer behind a fetch failed; nothing was cached
    #[error("Producer failed for '{key}': {cause}")]
    Producer {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// Persisted tier read, write or serialization failed
    #[error("Persisted tier unavailable: {0}")]
    Persistence(String),

    /// Unrecognised invalidation action
    #[error("Unknown invalidation action: {0}")]
    InvalidAction(String),

    /// Unrecognised listing entity type
    #[error("Unknown entity type: {0}")]
    InvalidEntityType(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Wraps a producer failure for `key`.
    pub fn producer(key: impl Into<String>, cause: anyhow::Error) -> Self {
        CacheError::Producer {
            key: key.into(),
            cause: Arc::new(cause),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidAction(_)
            | CacheError::InvalidEntityType(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Producer { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the listing cache.
pub type Result<T> = std::result::Result<T, CacheError>;
