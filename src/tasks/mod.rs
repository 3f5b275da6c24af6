//! Background Tasks Module
//!
//! Work that runs outside request handling.
//!
//! # Tasks
//! - TTL Cleanup: Sweeps expired entries from both tiers at a fixed interval
//! - Lifecycle: Sweeps on visibility changes, drops the memory tier on teardown

mod cleanup;
mod lifecycle;

pub use cleanup::spawn_cleanup_task;
pub use lifecycle::{handle_host_event, HostEvent};
