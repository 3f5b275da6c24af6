//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle for each admin endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use listing_cache::{
    api::create_router,
    cache::{Cache, CacheStore, ManualClock, MemoryStorage, DEFAULT_STORAGE_KEY, DEFAULT_TTL},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, Cache, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    let cache = Cache::new(
        CacheStore::new(100, DEFAULT_TTL)
            .with_persisted(Arc::new(MemoryStorage::new()), DEFAULT_STORAGE_KEY)
            .with_clock(Arc::new(clock.clone())),
    );
    let app = create_router(AppState::new(cache.clone()));
    (app, cache, clock)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == SET / GET Endpoint Tests ==

#[tokio::test]
async fn test_set_then_get_round_trip() {
    let (app, _, _) = create_test_app();

    let listing = json!({"id": 7, "title": "Lot 7", "price": 125000});
    let (status, json) = send(
        &app,
        "PUT",
        "/cache",
        Some(json!({"key": "land-details-7", "value": listing})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("land-details-7"));

    let (status, json) = send(&app, "GET", "/cache/land-details-7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "land-details-7");
    assert_eq!(json["value"], listing);
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let (app, _, _) = create_test_app();

    let (status, json) = send(&app, "GET", "/cache/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let (app, _, clock) = create_test_app();

    send(
        &app,
        "PUT",
        "/cache",
        Some(json!({"key": "search-lands-q", "value": [1, 2], "ttl": 1})),
    )
    .await;
    let (status, _) = send(&app, "GET", "/cache/search-lands-q", None).await;
    assert_eq!(status, StatusCode::OK);

    clock.advance(Duration::from_secs(1));

    let (status, _) = send(&app, "GET", "/cache/search-lands-q", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_reports_remaining_ttl() {
    let (app, cache, clock) = create_test_app();
    cache.set("land-details-3", json!({"id": 3}), Some(Duration::from_secs(60)), false);
    cache.set("favorite-lands", json!([3]), Some(Duration::ZERO), true);
    clock.advance(Duration::from_secs(15));

    let (status, json) = send(&app, "GET", "/cache/land-details-3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ttl_remaining_ms"], 45_000);

    let (_, json) = send(&app, "GET", "/cache/favorite-lands", None).await;
    assert!(json["ttl_remaining_ms"].is_null());
}

#[tokio::test]
async fn test_persistent_set_survives_memory_clear() {
    let (app, cache, _) = create_test_app();

    let (_, json) = send(
        &app,
        "PUT",
        "/cache",
        Some(json!({"key": "favorite-lands", "value": [3], "persistent": true})),
    )
    .await;
    assert_eq!(json["persistent"], true);

    let (status, json) = send(&app, "DELETE", "/cache?include_storage=false", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["include_storage"], false);
    assert!(cache.memory_keys().is_empty());

    let (status, json) = send(&app, "GET", "/cache/favorite-lands", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], json!([3]));
}

#[tokio::test]
async fn test_clear_defaults_to_both_tiers() {
    let (app, cache, _) = create_test_app();
    cache.set("favorite-houses", json!([1]), None, true);

    let (status, _) = send(&app, "DELETE", "/cache", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(cache.storage_keys().is_empty());
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_is_idempotent() {
    let (app, cache, _) = create_test_app();
    cache.set("to_delete", json!("value"), None, true);

    let (status, json) = send(&app, "DELETE", "/cache/to_delete", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], true);
    assert!(cache.storage_keys().is_empty());

    let (status, json) = send(&app, "DELETE", "/cache/to_delete", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], false);
}

// == Sweep and Invalidation Endpoint Tests ==

#[tokio::test]
async fn test_clear_expired_endpoint() {
    let (app, cache, clock) = create_test_app();
    cache.set("short", json!(1), Some(Duration::from_secs(1)), true);
    cache.set("long", json!(2), Some(Duration::from_secs(3600)), false);
    clock.advance(Duration::from_secs(5));

    let (status, json) = send(&app, "POST", "/cache/clear-expired", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert_eq!(cache.memory_keys(), vec!["long".to_string()]);
}

#[tokio::test]
async fn test_pattern_invalidation_endpoint() {
    let (app, cache, _) = create_test_app();
    for page in 1..=3 {
        cache.set(&format!("available-lands-{}-6", page), json!([]), None, false);
    }
    cache.set("available-houses-1-6", json!([]), None, false);

    let (status, json) = send(
        &app,
        "POST",
        "/invalidate/pattern",
        Some(json!({"pattern": "available-lands-*"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 3);
    assert_eq!(cache.memory_keys(), vec!["available-houses-1-6".to_string()]);
}

#[tokio::test]
async fn test_recipe_invalidation_endpoint() {
    let (app, cache, _) = create_test_app();
    cache.set("house-details-12", json!({}), None, false);
    cache.set("favorite-houses", json!([12]), None, true);
    cache.set("houses-page-1", json!([]), None, false);

    let (status, json) = send(
        &app,
        "POST",
        "/invalidate",
        Some(json!({"action": "favorite", "type": "house", "id": 12})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert_eq!(cache.memory_keys(), vec!["houses-page-1".to_string()]);
}

#[tokio::test]
async fn test_logout_invalidation_needs_no_type() {
    let (app, cache, _) = create_test_app();
    cache.set("my-lands", json!([]), None, false);
    cache.set("user-profile", json!({}), None, true);
    cache.set("land-details-1", json!({}), None, false);

    let (status, _) = send(&app, "POST", "/invalidate", Some(json!({"action": "logout"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.memory_keys(), vec!["land-details-1".to_string()]);
    assert!(cache.storage_keys().is_empty());
}

#[tokio::test]
async fn test_unknown_action_rejected() {
    let (app, _, _) = create_test_app();

    let (status, json) = send(
        &app,
        "POST",
        "/invalidate",
        Some(json!({"action": "archive", "type": "land"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("archive"));
}

#[tokio::test]
async fn test_unknown_entity_type_rejected() {
    let (app, _, _) = create_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/invalidate",
        Some(json!({"action": "add", "type": "castle"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// == Stats Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (app, cache, _) = create_test_app();
    cache.set("a", json!(1), None, false);
    cache.set("b", json!(2), None, false);
    cache.set("c", json!(3), None, true);
    cache.get("a");
    cache.get("missing");

    let (status, json) = send(&app, "GET", "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["memory"], 3);
    assert_eq!(json["storage"], 1);
    assert_eq!(json["total"], 3);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert!((json["hit_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _, _) = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

// == Error Handling Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/cache")
                .header("content-type", "application/json")
                .body(Body::from("not valid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let (app, _, _) = create_test_app();

    let (status, json) = send(&app, "PUT", "/cache", Some(json!({"key": "", "value": 1}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}
