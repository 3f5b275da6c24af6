//! API Routes
//!
//! Configures the Axum router with all cache admin endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_expired_handler, clear_handler, delete_handler, get_handler, health_handler,
    invalidate_handler, invalidate_pattern_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a value
/// - `DELETE /cache` - Clear the cache (`?include_storage=false` keeps the persisted tier)
/// - `GET /cache/:key` - Retrieve a value by key
/// - `DELETE /cache/:key` - Remove a key from both tiers
/// - `POST /cache/clear-expired` - Sweep expired entries
/// - `POST /invalidate/pattern` - Remove keys matching a `*` pattern
/// - `POST /invalidate` - Run the invalidation recipe for a mutation
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(set_handler).delete(clear_handler))
        .route("/cache/clear-expired", post(clear_expired_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/invalidate/pattern", post(invalidate_pattern_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
