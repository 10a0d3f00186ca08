//! Merchant watch service binary.
//!
//! Wires the collaborators together, starts the scheduler, and serves the
//! HTTP surface until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use merchant_watch::auth::StaticTokenProvider;
use merchant_watch::client::{RetryPolicy, StatusClient};
use merchant_watch::notify::{AlertChannel, EmailChannel};
use merchant_watch::scheduler::Scheduler;
use merchant_watch::server::{self, AppState};
use merchant_watch::store::FileStore;
use merchant_watch::{CheckEngine, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env().add_directive("merchant_watch=info".parse()?),
        )
        .init();

    info!("Starting merchant watch service...");

    let config = Config::default();

    let tokens = Arc::new(StaticTokenProvider::new(
        config.merchant_api_token.clone().unwrap_or_default(),
    ));
    let client = StatusClient::new(
        config.merchant_base_url.clone(),
        config.merchant_account_id.clone(),
        tokens,
        RetryPolicy {
            max_attempts: config.max_fetch_attempts,
            ..RetryPolicy::default()
        },
    );

    let store = Arc::new(
        FileStore::open(&config.snapshot_path).context("Failed to open snapshot store")?,
    );
    info!(path = %config.snapshot_path, "Snapshot store ready");

    let channel = Arc::new(EmailChannel::new(
        config.mail_api_url.clone(),
        config.mail_api_key.clone(),
        config.mail_from.clone(),
        config.mail_to.clone(),
    ));
    if channel.enabled() {
        info!(to = %config.mail_to, "Email alerts enabled");
    } else {
        info!("No MAIL_API_KEY configured - alerts will be logged but not delivered");
    }

    let engine = Arc::new(CheckEngine::new(
        client,
        store,
        channel,
        config.thresholds(),
        config.top_issues_limit,
    ));

    let (scheduler, shutdown) = Scheduler::new(
        Arc::clone(&engine),
        Duration::from_secs(config.check_interval_minutes * 60),
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    let state = AppState::new(Arc::clone(&engine)).context("Failed to build app state")?;
    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!(port = config.port, "Merchant watch listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let the in-flight cycle finish; shutdown is honored at cycle boundaries.
    shutdown.shutdown();
    scheduler_handle.await.ok();

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
