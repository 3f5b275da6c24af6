//! Listing Cache - cache admin server
//!
//! Hosts one process-wide cache and exposes it over HTTP.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listing_cache::api::{create_router, AppState};
use listing_cache::binding::CacheManager;
use listing_cache::cache::Cache;
use listing_cache::config::Config;
use listing_cache::tasks::{handle_host_event, spawn_cleanup_task, HostEvent};

/// Main entry point for the listing cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache with its persisted tier
/// 4. Start the TTL sweep and the stats poller
/// 5. Serve the admin API on the configured port
/// 6. On SIGINT/SIGTERM stop background work and run teardown
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Listing Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, default_ttl={}s, port={}, cleanup_interval={}s, storage_dir={:?}",
        config.capacity,
        config.default_ttl.as_secs(),
        config.server_port,
        config.cleanup_interval.as_secs(),
        config.storage_dir
    );

    let state = AppState::from_config(&config);
    let stats = state.cache.stats();
    info!(
        "Cache initialized: {} persisted entries restored",
        stats.storage
    );

    let cleanup_handle = spawn_cleanup_task(state.cache.clone(), config.cleanup_interval);
    let manager = CacheManager::start(state.cache.clone(), config.stats_interval);
    info!("Background tasks started");

    let cache = state.cache.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle, cache))
        .await
        .context("server error")?;

    drop(manager);
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown, aborts the sweep task and runs the teardown hook.
async fn shutdown_signal(cleanup_handle: JoinHandle<()>, cache: Cache) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");

    handle_host_event(&cache, HostEvent::Teardown);
}
