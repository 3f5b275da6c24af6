//! LRU Tracker Module
//!
//! Access ordering for the evictable part of the memory tier.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Tracks access order of evictable (non-persistent) memory-tier keys.
///
/// Persistent entries are never registered here, so popping the oldest key
/// always yields an entry the size bound is allowed to drop.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently accessed
/// - Back = Least recently accessed
#[derive(Debug, Default)]
pub struct LruTracker {
    order: VecDeque<String>,
}

impl LruTracker {
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as the most recently accessed.
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    /// Stops tracking a key. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    /// Stops tracking every key for which `drop_key` returns true.
    pub fn remove_where(&mut self, mut drop_key: impl FnMut(&str) -> bool) {
        self.order.retain(|k| !drop_key(k.as_str()));
    }

    // == Evict Oldest ==
    /// Returns and forgets the least recently accessed key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    /// Returns the least recently accessed key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.back().map(String::as_str)
    }

    /// Forgets every key.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
