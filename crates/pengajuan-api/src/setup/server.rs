//! Listener binding and graceful shutdown

use anyhow::{Context, Result};
use axum::Router;
use pengajuan_core::Config;
use std::net::SocketAddr;

/// Bind the configured port and serve until SIGINT or SIGTERM. In-flight
/// relays finish before this returns.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        environment = %config.environment(),
        list_configured = config.list_api_url().is_some(),
        submission_configured = config.submission_api_url().is_some(),
        gateway_configured = config.storage_gateway_url().is_some(),
        ttd_sources = config.ttd_source_allowed_origins().len(),
        "Relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated with an error")?;

    tracing::info!("Relay stopped");
    Ok(())
}

/// Resolves on the first of Ctrl+C or SIGTERM. A handler that cannot be
/// installed is logged and never fires; the other one still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    tracing::info!(signal = received, "Shutdown requested, draining in-flight requests");
}
