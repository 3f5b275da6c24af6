//! Listing Cache - a two-tier client cache for property listing data
//!
//! A bounded, TTL-aware memory tier backed by a persisted tier, with
//! fetch coalescing, wildcard and recipe-driven invalidation, and
//! reactive bindings for consumers.

pub mod api;
pub mod binding;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use binding::{CacheBinding, CacheManager, MultiBinding};
pub use cache::{Cache, CacheStats, CacheStore};
pub use config::Config;
pub use error::CacheError;
pub use invalidation::{invalidate, smart_invalidation, CacheAction, EntityType};
pub use tasks::{handle_host_event, spawn_cleanup_task, HostEvent};
