//! Cache Statistics Module
//!
//! Tier occupancy plus hit, miss and eviction counters.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache occupancy and performance counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries currently held by the memory tier
    pub memory: usize,
    /// Entries currently held by the persisted tier
    pub storage: usize,
    /// Distinct keys across both tiers
    pub total: usize,
    /// Reads answered from either tier
    pub hits: u64,
    /// Reads that found nothing fresh
    pub misses: u64,
    /// Entries dropped by the memory size bound
    pub evictions: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Sets the occupancy figures, keeping the counters.
    pub fn with_occupancy(mut self, memory: usize, storage: usize, total: usize) -> Self {
        self.memory = memory;
        self.storage = storage;
        self.total = total;
        self
    }
}
