//! Host Lifecycle Hooks
//!
//! The host reports visibility and teardown; the cache sweeps expired entries
//! on each and drops its memory tier on teardown. The persisted tier is kept
//! across sessions.

use tracing::info;

use crate::cache::Cache;

/// Lifecycle transitions of the hosting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The host went to the background
    Hidden,
    /// The host came back to the foreground
    Visible,
    /// The host is shutting down
    Teardown,
}

/// Reacts to a host lifecycle event. Returns the number of expired entries swept.
pub fn handle_host_event(cache: &Cache, event: HostEvent) -> usize {
    let swept = cache.clear_expired();
    if event == HostEvent::Teardown {
        cache.clear(false);
        info!("Teardown: swept {} expired entries, memory tier dropped", swept);
    } else {
        info!("{:?}: swept {} expired entries", event, swept);
    }
    swept
}
