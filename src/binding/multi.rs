//! Many-key binding.
//!
//! Each config is fetched independently and concurrently; one key failing
//! only records an error for that key.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use crate::binding::Producer;
use crate::cache::Cache;

/// One key of a [`MultiBinding`].
#[derive(Clone)]
pub struct CacheConfig {
    pub key: String,
    pub producer: Producer,
    pub ttl: Option<Duration>,
    pub persistent: bool,
}

impl CacheConfig {
    pub fn new(key: impl Into<String>, producer: Producer) -> Self {
        Self {
            key: key.into(),
            producer,
            ttl: None,
            persistent: false,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// Per-key data and errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiState {
    pub data: HashMap<String, Value>,
    pub errors: HashMap<String, String>,
    pub loading: bool,
}

/// Binds several keys to one consumer.
pub struct MultiBinding {
    cache: Cache,
    configs: Vec<CacheConfig>,
    state: watch::Sender<MultiState>,
}

impl MultiBinding {
    pub fn new(cache: Cache, configs: Vec<CacheConfig>) -> Self {
        let (state, _) = watch::channel(MultiState::default());
        Self {
            cache,
            configs,
            state,
        }
    }

    /// Creates the binding and, with `auto_fetch`, fetches every key.
    pub async fn mount(cache: Cache, configs: Vec<CacheConfig>, auto_fetch: bool) -> Self {
        let binding = Self::new(cache, configs);
        if auto_fetch {
            binding.fetch_all(false).await;
        }
        binding
    }

    pub fn subscribe(&self) -> watch::Receiver<MultiState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> MultiState {
        self.state.borrow().clone()
    }

    /// Fetches every key concurrently; `force` drops cached values first.
    pub async fn fetch_all(&self, force: bool) -> MultiState {
        self.state.send_modify(|state| state.loading = true);

        let fetches = self.configs.iter().map(|config| {
            let cache = self.cache.clone();
            async move {
                if force {
                    cache.remove(&config.key);
                }
                let producer = config.producer.clone();
                let outcome = cache
                    .get_cached_or_fetch(
                        &config.key,
                        move || producer(),
                        config.ttl,
                        config.persistent,
                    )
                    .await;
                (config.key.clone(), outcome)
            }
        });

        let mut data = HashMap::new();
        let mut errors = HashMap::new();
        for (key, outcome) in join_all(fetches).await {
            match outcome {
                Ok(value) => {
                    data.insert(key, value);
                }
                Err(e) => {
                    warn!("Multi-binding fetch failed for {}: {}", key, e);
                    errors.insert(key, e.to_string());
                }
            }
        }

        let next = MultiState {
            data,
            errors,
            loading: false,
        };
        self.state.send_replace(next.clone());
        next
    }

    /// Refetches every key, bypassing the cache.
    pub async fn refresh_all(&self) -> MultiState {
        self.fetch_all(true).await
    }

    /// Drops every key from the cache and local state.
    pub fn invalidate_all(&self) {
        for config in &self.configs {
            self.cache.remove(&config.key);
        }
        self.state.send_replace(MultiState::default());
    }
}
