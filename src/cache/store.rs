//! Cache Store Module
//!
//! Two-tier cache engine: a bounded memory map with LRU eviction in front of
//! an optional persisted map. Persistent entries are written through to the
//! persisted tier and promoted back into memory on read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, Clock, LruTracker, PersistedStore, PersistedTier, SystemClock,
    WildcardPattern,
};

/// Default memory tier capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time to live for entries written without an explicit TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

// == Cache Store ==
/// Main cache storage: memory tier, persisted tier and eviction bookkeeping.
#[derive(Debug)]
pub struct CacheStore {
    /// Memory tier
    memory: HashMap<String, CacheEntry>,
    /// Access order of the non-persistent memory entries
    lru: LruTracker,
    /// Persisted tier
    persisted: PersistedTier,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
    /// Maximum memory entries before non-persistent ones are evicted
    capacity: usize,
    /// TTL applied when a write does not name one
    default_ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a memory-only store.
    ///
    /// # Arguments
    /// * `capacity` - Memory tier size bound
    /// * `default_ttl` - TTL used when `set` is called without one
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            memory: HashMap::new(),
            lru: LruTracker::new(),
            persisted: PersistedTier::disabled(),
            clock: Arc::new(SystemClock),
            stats: CacheStats::new(),
            capacity,
            default_ttl,
        }
    }

    /// Attaches a persisted tier stored under `storage_key`.
    pub fn with_persisted(
        mut self,
        storage: Arc<dyn PersistedStore>,
        storage_key: impl Into<String>,
    ) -> Self {
        self.persisted = PersistedTier::new(storage, storage_key);
        self
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // == Get ==
    /// Retrieves a fresh value, promoting persisted hits into memory.
    ///
    /// Expired entries found along the way are deleted from their tier.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();

        if let Some(entry) = self.memory.get_mut(key) {
            if !entry.is_expired_at(now) {
                entry.touch(now);
                let value = entry.value.clone();
                if !entry.persistent {
                    self.lru.touch(key);
                }
                self.stats.record_hit();
                debug!("Memory hit: {}", key);
                return Some(value);
            }

            self.memory.remove(key);
            self.lru.remove(key);
            debug!("Dropped expired memory entry: {}", key);
        }

        if self.persisted.is_enabled() {
            let mut map = self.persisted.read_map();
            if let Some(mut stored) = map.remove(key) {
                if !stored.is_expired_at(now) {
                    stored.touch(now);
                    let value = stored.value.clone();
                    self.insert_memory(key, stored);
                    self.stats.record_hit();
                    debug!("Promoted persisted entry into memory: {}", key);
                    return Some(value);
                }

                self.persisted.write_map(&map);
                debug!("Dropped expired persisted entry: {}", key);
            }
        }

        self.stats.record_miss();
        debug!("Cache miss: {}", key);
        None
    }

    // == Has ==
    /// Returns true if a fresh entry exists in either tier.
    ///
    /// Unlike [`CacheStore::get`] this neither promotes nor bumps access time.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        if let Some(entry) = self.memory.get(key) {
            if !entry.is_expired_at(now) {
                return true;
            }
        }
        self.persisted
            .read_map()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Set ==
    /// Stores a value.
    ///
    /// `ttl` falls back to the store default; a zero TTL never expires.
    /// Persistent entries are also written through to the persisted tier.
    pub fn set(&mut self, key: &str, value: Value, ttl: Option<Duration>, persistent: bool) {
        let now = self.clock.now_ms();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(value, ttl, persistent, now);

        if persistent && self.persisted.is_enabled() {
            let mut map = self.persisted.read_map();
            map.insert(key.to_string(), entry.clone());
            self.persisted.write_map(&map);
        }

        self.insert_memory(key, entry);
    }

    // == Remove ==
    /// Removes a key from both tiers. Returns true if anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let in_memory = self.memory.remove(key).is_some();
        self.lru.remove(key);

        let mut in_storage = false;
        if self.persisted.is_enabled() {
            let mut map = self.persisted.read_map();
            if map.remove(key).is_some() {
                self.persisted.write_map(&map);
                in_storage = true;
            }
        }

        in_memory || in_storage
    }

    // == Clear ==
    /// Empties the memory tier and, if `include_storage`, the persisted tier.
    pub fn clear(&mut self, include_storage: bool) {
        self.memory.clear();
        self.lru.clear();
        if include_storage {
            self.persisted.clear();
        }
    }

    // == Cleanup Expired ==
    /// Removes expired entries from both tiers.
    ///
    /// Returns the number of entries removed across both tiers.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.remove_where(|_, entry| entry.is_expired_at(now))
    }

    // == Pattern Removal ==
    /// Removes every key in either tier that `pattern` matches.
    ///
    /// Returns the number of entries removed across both tiers.
    pub fn remove_matching(&mut self, pattern: &WildcardPattern) -> usize {
        self.remove_where(|key, _| pattern.matches(key))
    }

    fn remove_where(&mut self, mut doomed: impl FnMut(&str, &CacheEntry) -> bool) -> usize {
        let before = self.memory.len();
        self.memory.retain(|key, entry| !doomed(key.as_str(), entry));
        let mut removed = before - self.memory.len();

        let memory = &self.memory;
        self.lru.remove_where(|key| !memory.contains_key(key));

        if self.persisted.is_enabled() {
            let mut map = self.persisted.read_map();
            let before = map.len();
            map.retain(|key, entry| !doomed(key.as_str(), entry));
            if map.len() != before {
                removed += before - map.len();
                self.persisted.write_map(&map);
            }
        }

        removed
    }

    // == Stats ==
    /// Returns current occupancy and counters.
    pub fn stats(&self) -> CacheStats {
        let storage_keys = self.persisted.read_map().into_keys().collect::<HashSet<_>>();
        let total = self
            .memory
            .keys()
            .filter(|key| !storage_keys.contains(*key))
            .count()
            + storage_keys.len();

        self.stats
            .clone()
            .with_occupancy(self.memory.len(), storage_keys.len(), total)
    }

    /// Keys currently in the memory tier, in no particular order.
    pub fn memory_keys(&self) -> Vec<String> {
        self.memory.keys().cloned().collect()
    }

    /// Keys currently in the persisted tier, in no particular order.
    pub fn storage_keys(&self) -> Vec<String> {
        self.persisted.read_map().into_keys().collect()
    }

    /// Memory tier entry, without touching it.
    pub fn peek_memory(&self, key: &str) -> Option<&CacheEntry> {
        self.memory.get(key)
    }

    /// Number of entries in the memory tier.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Milliseconds until the memory-tier entry for `key` expires.
    ///
    /// `None` if the key is not in memory or never expires.
    pub fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        let now = self.clock.now_ms();
        self.memory
            .get(key)
            .and_then(|entry| entry.ttl_remaining_ms(now))
    }

    // == Memory Write ==
    fn insert_memory(&mut self, key: &str, entry: CacheEntry) {
        if entry.persistent {
            self.lru.remove(key);
        } else {
            self.lru.touch(key);
        }
        self.memory.insert(key.to_string(), entry);
        self.enforce_capacity();
    }

    /// Evicts least recently accessed non-persistent entries until the
    /// memory tier fits its capacity or only persistent entries remain.
    fn enforce_capacity(&mut self) {
        while self.memory.len() > self.capacity {
            let Some(victim) = self.lru.evict_oldest() else {
                break;
            };
            self.memory.remove(&victim);
            self.stats.record_eviction();
            debug!("Evicted least recently used entry: {}", victim);
        }
    }
}
