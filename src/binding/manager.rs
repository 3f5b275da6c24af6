//! Cache-wide maintenance binding.
//!
//! Polls statistics on an interval and exposes maintenance operations that
//! refresh the published statistics right away.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{Cache, CacheStats};

/// Default statistics polling interval.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Publishes cache statistics and wraps cache-wide operations.
pub struct CacheManager {
    cache: Cache,
    stats: Arc<watch::Sender<CacheStats>>,
    poller: Option<JoinHandle<()>>,
}

impl CacheManager {
    /// Creates a manager without background polling.
    pub fn new(cache: Cache) -> Self {
        let (stats, _) = watch::channel(cache.stats());
        Self {
            cache,
            stats: Arc::new(stats),
            poller: None,
        }
    }

    /// Creates a manager that republishes statistics every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(cache: Cache, interval: Duration) -> Self {
        let mut manager = Self::new(cache);
        let cache = manager.cache.clone();
        let stats = manager.stats.clone();

        manager.poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                stats.send_replace(cache.stats());
                debug!("Cache stats refreshed");
            }
        }));

        manager
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheStats> {
        self.stats.subscribe()
    }

    /// Last published statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.borrow().clone()
    }

    /// Recomputes and publishes statistics now.
    pub fn refresh_stats(&self) -> CacheStats {
        let current = self.cache.stats();
        self.stats.send_replace(current.clone());
        current
    }

    /// Invalidates by pattern, then refreshes statistics.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let removed = self.cache.invalidate_by_pattern(pattern);
        self.refresh_stats();
        removed
    }

    /// Clears both tiers, then refreshes statistics.
    pub fn clear_all(&self) {
        self.cache.clear(true);
        self.refresh_stats();
    }

    /// Sweeps expired entries, then refreshes statistics.
    pub fn clear_expired(&self) -> usize {
        let removed = self.cache.clear_expired();
        self.refresh_stats();
        removed
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}
