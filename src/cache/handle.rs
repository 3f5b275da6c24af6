//! Shared cache handle.
//!
//! [`Cache`] is the process-wide entry point: a cheap-to-clone handle over one
//! [`CacheStore`]. Every operation takes the store lock once, so each tier's
//! read-modify-write runs as a single critical section. The lock is never
//! held across an `.await`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::fetch::InflightRegistry;
use crate::cache::{
    CacheStats, CacheStore, FileStorage, MemoryStorage, PersistedStore, WildcardPattern,
};
use crate::config::Config;

/// Cloneable handle to a shared [`CacheStore`].
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<Mutex<CacheStore>>,
    pub(crate) inflight: InflightRegistry,
}

impl Cache {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            inflight: InflightRegistry::default(),
        }
    }

    /// Builds a cache from configuration.
    ///
    /// With `storage_dir` set the persisted tier lives in that directory;
    /// if the directory cannot be opened, or none is configured, the
    /// persisted tier is kept in process memory.
    pub fn from_config(config: &Config) -> Self {
        let storage: Arc<dyn PersistedStore> = match &config.storage_dir {
            Some(dir) => match FileStorage::new(dir) {
                Ok(files) => {
                    info!("Persisted tier stored in {}", dir.display());
                    Arc::new(files)
                }
                Err(e) => {
                    warn!("{}; falling back to in-memory persisted tier", e);
                    Arc::new(MemoryStorage::new())
                }
            },
            None => Arc::new(MemoryStorage::new()),
        };

        let store = CacheStore::new(config.capacity, config.default_ttl)
            .with_persisted(storage, config.storage_key.clone());
        Self::new(store)
    }

    /// Returns the fresh value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.lock().get(key)
    }

    /// Milliseconds left before `key` expires from the memory tier.
    pub fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        self.store.lock().ttl_remaining_ms(key)
    }

    /// Returns true if `key` holds a fresh value, without touching it.
    pub fn has(&self, key: &str) -> bool {
        self.store.lock().has(key)
    }

    /// Stores `value`; `None` TTL means the configured default.
    pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>, persistent: bool) {
        self.store.lock().set(key, value, ttl, persistent);
    }

    /// Stores a non-persistent value with the default TTL.
    pub fn set_default(&self, key: &str, value: Value) {
        self.set(key, value, None, false);
    }

    /// Removes `key` from both tiers. Removing an absent key is a no-op.
    ///
    /// A producer run still in flight for `key` is detached, so its result
    /// is not cached.
    pub fn remove(&self, key: &str) -> bool {
        self.inflight.detach(key);
        let removed = self.store.lock().remove(key);
        if removed {
            debug!("Removed cache key: {}", key);
        }
        removed
    }

    pub fn clear(&self, include_storage: bool) {
        self.inflight.detach_all();
        self.store.lock().clear(include_storage);
        info!("Cache cleared (include_storage={})", include_storage);
    }

    /// Drops the memory tier only, as a process restart would.
    pub fn restart_memory(&self) {
        self.clear(false);
    }

    /// Sweeps expired entries from both tiers, returning how many went.
    pub fn clear_expired(&self) -> usize {
        self.store.lock().cleanup_expired()
    }

    /// Removes every key matching a `*`-wildcard pattern from both tiers.
    ///
    /// Returns the number of entries removed. An uncompilable pattern is
    /// logged and removes nothing.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let compiled = match WildcardPattern::new(pattern) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!("Skipping invalidation: {}", e);
                return 0;
            }
        };

        self.inflight.detach_matching(&compiled);
        let removed = self.store.lock().remove_matching(&compiled);
        debug!("Pattern '{}' invalidated {} entries", pattern, removed);
        removed
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn memory_keys(&self) -> Vec<String> {
        self.store.lock().memory_keys()
    }

    pub fn storage_keys(&self) -> Vec<String> {
        self.store.lock().storage_keys()
    }

    /// Returns true if `key` is resident in the memory tier (fresh or not).
    pub fn in_memory(&self, key: &str) -> bool {
        self.store.lock().peek_memory(key).is_some()
    }
}
