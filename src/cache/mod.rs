//! Cache Module
//!
//! Two-tier caching with TTL expiration, LRU eviction of the memory tier,
//! wildcard invalidation and coalesced fetches.

mod clock;
mod entry;
mod fetch;
mod handle;
mod lru;
mod pattern;
mod persist;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use handle::Cache;
pub use lru::LruTracker;
pub use pattern::WildcardPattern;
pub use persist::{
    FileStorage, MemoryStorage, PersistedStore, PersistedTier, DEFAULT_STORAGE_KEY,
};
pub use stats::CacheStats;
pub use store::{CacheStore, DEFAULT_CAPACITY, DEFAULT_TTL};
