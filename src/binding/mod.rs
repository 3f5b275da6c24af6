//! Binding Module
//!
//! Adapts the cache to a consumer's lifecycle: a binding is created when a
//! view mounts, republishes its state on a watch channel whenever it changes,
//! and exposes refresh, invalidate and preload operations.
//!
//! # Bindings
//! - [`CacheBinding`]: one key and one producer
//! - [`MultiBinding`]: many independent keys fetched concurrently
//! - [`CacheManager`]: periodic stats and cache-wide maintenance

mod manager;
mod multi;
mod single;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

pub use manager::{CacheManager, DEFAULT_STATS_INTERVAL};
pub use multi::{CacheConfig, MultiBinding, MultiState};
pub use single::{BindingOptions, BindingState, CacheBinding};

/// A reusable async value producer.
pub type Producer = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Wraps an async closure into a [`Producer`].
pub fn producer<F, Fut>(f: F) -> Producer
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}
