//! Shutdown signal plumbing.

use tracing::info;

/// Resolve when a termination signal (SIGINT or SIGTERM) arrives.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to set up SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to set up SIGTERM handler");

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };
    info!("Received {name}, shutting down");
}

/// Resolve when Ctrl+C arrives.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to set up Ctrl+C handler");
    info!("Received Ctrl+C, shutting down");
}
