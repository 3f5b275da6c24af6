//! Single-key binding.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::binding::Producer;
use crate::cache::Cache;

// == Options ==
/// How a binding caches and when it fetches.
#[derive(Debug, Clone)]
pub struct BindingOptions {
    /// TTL for fetched values; `None` uses the cache default
    pub ttl: Option<Duration>,
    /// Write fetched values through to the persisted tier
    pub persistent: bool,
    /// Load on mount and whenever dependencies change
    pub auto_fetch: bool,
    /// Values the binding reloads on when they change
    pub dependencies: Vec<String>,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            persistent: false,
            auto_fetch: true,
            dependencies: Vec::new(),
        }
    }
}

// == State ==
/// What a bound consumer renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_fetched: Option<DateTime<Utc>>,
}

// == Cache Binding ==
/// Binds one cache key and its producer to a consumer.
pub struct CacheBinding {
    cache: Cache,
    key: String,
    producer: Producer,
    options: BindingOptions,
    state: watch::Sender<BindingState>,
}

impl CacheBinding {
    /// Creates a binding without loading anything.
    pub fn new(
        cache: Cache,
        key: impl Into<String>,
        producer: Producer,
        options: BindingOptions,
    ) -> Self {
        let (state, _) = watch::channel(BindingState::default());
        Self {
            cache,
            key: key.into(),
            producer,
            options,
            state,
        }
    }

    /// Creates a binding and, with `auto_fetch`, loads it.
    pub async fn mount(
        cache: Cache,
        key: impl Into<String>,
        producer: Producer,
        options: BindingOptions,
    ) -> Self {
        let binding = Self::new(cache, key, producer, options);
        if binding.options.auto_fetch {
            binding.load().await;
        }
        binding
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<BindingState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> BindingState {
        self.state.borrow().clone()
    }

    /// Whether the key currently holds a fresh cached value.
    pub fn is_in_cache(&self) -> bool {
        self.cache.has(&self.key)
    }

    /// Adopts a cached value without a loading phase, or fetches.
    async fn load(&self) {
        match self.cache.get(&self.key) {
            Some(value) => {
                debug!("Binding adopted cached value: {}", self.key);
                self.state.send_modify(|state| {
                    state.data = Some(value);
                    state.loading = false;
                    state.error = None;
                    state.last_fetched = Some(Utc::now());
                });
            }
            None => {
                self.fetch_data(false).await;
            }
        }
    }

    // == Fetch ==
    /// Fetches through the cache; `force` drops the cached value first.
    ///
    /// Returns the value on success. Failures land in `state().error`.
    pub async fn fetch_data(&self, force: bool) -> Option<Value> {
        if force {
            self.cache.remove(&self.key);
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let producer = self.producer.clone();
        let outcome = self
            .cache
            .get_cached_or_fetch(
                &self.key,
                move || producer(),
                self.options.ttl,
                self.options.persistent,
            )
            .await;

        match outcome {
            Ok(value) => {
                self.state.send_modify(|state| {
                    state.data = Some(value.clone());
                    state.loading = false;
                    state.last_fetched = Some(Utc::now());
                });
                Some(value)
            }
            Err(e) => {
                error!("Binding fetch failed for {}: {}", self.key, e);
                self.state.send_modify(|state| {
                    state.error = Some(e.to_string());
                    state.loading = false;
                });
                None
            }
        }
    }

    /// Bypasses the cache and refetches.
    pub async fn refresh(&self) -> Option<Value> {
        self.fetch_data(true).await
    }

    /// Drops the cached value and local data without refetching.
    pub fn invalidate(&self) {
        self.cache.remove(&self.key);
        self.state.send_modify(|state| {
            state.data = None;
            state.last_fetched = None;
        });
    }

    /// Warms the cache for this key. Failures are swallowed.
    pub async fn preload(&self) -> Option<Value> {
        let producer = self.producer.clone();
        self.cache
            .preload(
                &self.key,
                move || producer(),
                self.options.ttl,
                self.options.persistent,
            )
            .await
    }

    /// Updates the dependency list, reloading if it changed and `auto_fetch` is on.
    pub async fn set_dependencies(&mut self, dependencies: Vec<String>) {
        if dependencies == self.options.dependencies {
            return;
        }
        self.options.dependencies = dependencies;
        if self.options.auto_fetch {
            self.load().await;
        }
    }
}
