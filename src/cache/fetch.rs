//! Fetch coalescing.
//!
//! `get_cached_or_fetch` answers from the cache or runs a producer once and
//! caches its result. Concurrent misses on the same key share one producer
//! run through an in-flight registry of shared futures; failures reach every
//! waiter and are never cached.
//!
//! Invalidating a key detaches its in-flight run. A detached run still
//! answers the callers already waiting on it, but its result is not written
//! back and later callers start a fresh run.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{Cache, WildcardPattern};
use crate::error::{CacheError, Result};

type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

struct InflightFetch {
    token: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct Pending {
    fetches: HashMap<String, InflightFetch>,
    next_token: u64,
}

/// Producer runs currently in progress, by cache key.
#[derive(Clone, Default)]
pub(crate) struct InflightRegistry {
    pending: Arc<Mutex<Pending>>,
}

impl InflightRegistry {
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().fetches.len()
    }

    /// Forgets the run for `key`, if any.
    pub(crate) fn detach(&self, key: &str) {
        if self.pending.lock().fetches.remove(key).is_some() {
            debug!("Detached in-flight fetch: {}", key);
        }
    }

    /// Forgets every run whose key `pattern` matches.
    pub(crate) fn detach_matching(&self, pattern: &WildcardPattern) {
        self.pending
            .lock()
            .fetches
            .retain(|key, _| !pattern.matches(key));
    }

    pub(crate) fn detach_all(&self) {
        self.pending.lock().fetches.clear();
    }

    /// Retires the run identified by `token` and, while it is still the
    /// registered run for `key`, applies `write` under the registry lock.
    ///
    /// Returns false if the run was detached in the meantime.
    fn settle(&self, key: &str, token: u64, write: impl FnOnce()) -> bool {
        let mut pending = self.pending.lock();
        match pending.fetches.get(key) {
            Some(current) if current.token == token => {
                write();
                pending.fetches.remove(key);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for InflightRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflightRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

impl Cache {
    // == Get Or Fetch ==
    /// Returns the cached value for `key`, or runs `producer` and caches its
    /// output with `ttl` and `persistent`.
    ///
    /// Concurrent callers missing on the same key await a single producer
    /// run. A producer error is returned as [`CacheError::Producer`] and
    /// leaves the key uncached.
    pub async fn get_cached_or_fetch<F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
        persistent: bool,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let fetch = {
            let mut pending = self.inflight.pending.lock();
            if let Some(running) = pending.fetches.get(key) {
                debug!("Joining in-flight fetch: {}", key);
                running.fetch.clone()
            } else if let Some(value) = self.get(key) {
                // another caller finished between the first read and the lock
                return Ok(value);
            } else {
                let token = pending.next_token;
                pending.next_token += 1;
                let fetch = self.start_fetch(key, token, producer(), ttl, persistent);
                pending.fetches.insert(
                    key.to_string(),
                    InflightFetch {
                        token,
                        fetch: fetch.clone(),
                    },
                );
                fetch
            }
        };

        fetch.await
    }

    fn start_fetch<Fut>(
        &self,
        key: &str,
        token: u64,
        work: Fut,
        ttl: Option<Duration>,
        persistent: bool,
    ) -> SharedFetch
    where
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let cache = self.clone();
        let key = key.to_string();
        debug!("Fetching on cache miss: {}", key);

        async move {
            match work.await {
                Ok(value) => {
                    let stored = cache.inflight.settle(&key, token, || {
                        cache.set(&key, value.clone(), ttl, persistent);
                    });
                    if !stored {
                        debug!("Discarding result of detached fetch: {}", key);
                    }
                    Ok(value)
                }
                Err(cause) => {
                    cache.inflight.settle(&key, token, || {});
                    warn!("Producer failed for {}: {:#}", key, cause);
                    Err(CacheError::producer(&key, cause))
                }
            }
        }
        .boxed()
        .shared()
    }

    // == Preload ==
    /// Runs `producer` unconditionally and caches its output.
    ///
    /// Failures are logged and reported as `None`; they never propagate.
    pub async fn preload<F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
        persistent: bool,
    ) -> Option<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        match producer().await {
            Ok(value) => {
                self.set(key, value.clone(), ttl, persistent);
                debug!("Preloaded cache key: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Preload failed for {}: {:#}", key, e);
                None
            }
        }
    }
}
