//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::clock::duration_ms;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Field names serialize as `value`, `expiry`, `lastAccessed` and
/// `persistent`, which is the layout of the persisted tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expiry: Option<u64>,
    /// Last successful read or write (Unix milliseconds)
    pub last_accessed: u64,
    /// Whether the entry is mirrored into the persisted tier
    #[serde(default)]
    pub persistent: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry at instant `now_ms`.
    ///
    /// A zero TTL means the entry never expires.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Time to live measured from `now_ms`
    /// * `persistent` - Whether the entry belongs in the persisted tier
    /// * `now_ms` - Current Unix time in milliseconds
    pub fn new(value: Value, ttl: Duration, persistent: bool, now_ms: u64) -> Self {
        let expiry = if ttl.is_zero() {
            None
        } else {
            Some(now_ms.saturating_add(duration_ms(ttl)))
        };

        Self {
            value,
            expiry,
            last_accessed: now_ms,
            persistent,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time reaches its expiry instant.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expiry {
            Some(expiry) => now_ms >= expiry,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expiry.map(|expiry| expiry.saturating_sub(now_ms))
    }

    /// Bumps the access time used for eviction ordering.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_accessed = now_ms;
    }
}
