//! API Handlers
//!
//! HTTP request handlers for each cache admin endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::invalidation::{invalidate, CacheAction, EntityType};
use crate::models::{
    ClearQuery, ClearResponse, DeleteResponse, GetResponse, HealthResponse, InvalidateRequest,
    PatternRequest, RemovedResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// [`Cache`] is already a shared handle, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Cache::from_config(config))
    }
}

/// Handler for `PUT /cache`
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl();
    state.cache.set(&req.key, req.value, ttl, req.persistent);

    Ok(Json(SetResponse::new(req.key, req.persistent)))
}

/// Handler for `GET /cache/:key`
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    let ttl_remaining_ms = state.cache.ttl_remaining_ms(&key);

    Ok(Json(GetResponse::new(key, value, ttl_remaining_ms)))
}

/// Handler for `DELETE /cache/:key`
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let removed = state.cache.remove(&key);
    Json(DeleteResponse::new(key, removed))
}

/// Handler for `DELETE /cache`
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Json<ClearResponse> {
    let include_storage = query.include_storage();
    state.cache.clear(include_storage);
    Json(ClearResponse::new(include_storage))
}

/// Handler for `POST /cache/clear-expired`
pub async fn clear_expired_handler(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed = state.cache.clear_expired();
    info!("Manual sweep removed {} expired entries", removed);
    Json(RemovedResponse::new(removed))
}

/// Handler for `POST /invalidate/pattern`
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<PatternRequest>,
) -> Result<Json<RemovedResponse>> {
    if req.pattern.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Pattern cannot be empty".to_string(),
        ));
    }

    Ok(Json(RemovedResponse::new(
        state.cache.invalidate_by_pattern(&req.pattern),
    )))
}

/// Handler for `POST /invalidate`
///
/// Unknown actions, and unknown or missing entity types for entity-scoped
/// actions, are rejected with 400 rather than silently ignored.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<RemovedResponse>> {
    let action: CacheAction = req.action.parse()?;

    let entity = match req.entity.as_deref() {
        Some(raw) => Some(raw.parse::<EntityType>()?),
        None if action.needs_entity() => {
            return Err(CacheError::InvalidRequest(format!(
                "Action '{}' requires an entity type",
                req.action
            )));
        }
        None => None,
    };

    let id = req.id.map(|id| id.to_string());
    let removed = invalidate(&state.cache, action, entity, id.as_deref());

    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for `GET /stats`
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
