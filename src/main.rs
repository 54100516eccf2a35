//! Kakeibo Offline - network-first, cache-fallback proxy for the kakeibo web app
//!
//! Sits in front of the kakeibo server and keeps the application shell
//! available while the server is unreachable.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kakeibo_offline::cache::CacheStorage;
use kakeibo_offline::worker::EventOutcome;
use kakeibo_offline::{
    create_router, AppState, Config, Interceptor, UpstreamClient, WorkerEvent, WorkerSettings,
};

/// Main entry point for the offline proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache storage directory
/// 4. Dispatch install (seed the cache) and activate (drop outdated caches)
/// 5. Create Axum router and start the HTTP server
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kakeibo_offline=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Kakeibo Offline proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, cache={} in {:?}, bypass={:?}, port={}",
        config.upstream_url,
        config.cache_name,
        config.cache_dir,
        config.bypass_pattern,
        config.server_port
    );

    let storage = CacheStorage::open_dir(&config.cache_dir)
        .await
        .with_context(|| format!("opening cache storage at {:?}", config.cache_dir))?;
    let upstream = UpstreamClient::new(&config.upstream_url)
        .with_context(|| format!("creating upstream client for {}", config.upstream_url))?;

    let interceptor = Interceptor::new(
        WorkerSettings::from_config(&config),
        Arc::new(RwLock::new(storage)),
        Arc::new(upstream),
    );

    // Seeding failures are reported but never block activation
    if let EventOutcome::Installed(report) = interceptor
        .dispatch(WorkerEvent::Install)
        .await
        .context("install failed")?
    {
        if !report.is_complete() {
            warn!("Precache incomplete, not seeded: {:?}", report.failed);
        }
    }
    interceptor
        .dispatch(WorkerEvent::Activate)
        .await
        .context("activate failed")?;

    let app = create_router(AppState::new(interceptor));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Proxy listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Proxy shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// Cache writes still in flight at this point may be lost.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
}
