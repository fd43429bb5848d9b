//! Prometheus metrics endpoint.
//!
//! Installs the global recorder and serves the rendered registry over
//! HTTP, plus a health endpoint for liveness probes.

use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use snafu::prelude::*;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{MetricsError, PrometheusInitSnafu};

/// Install the Prometheus recorder and serve `/metrics` and `/health` on
/// the given address from a background task.
pub fn init(addr: SocketAddr) -> Result<(), MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context(PrometheusInitSnafu)?;

    tokio::spawn(serve(addr, handle));
    Ok(())
}

async fn serve(addr: SocketAddr, handle: PrometheusHandle) {
    let router = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "ok\n" }));

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind metrics endpoint on {}: {}", addr, e);
            return;
        }
    };
    info!("Serving metrics on http://{}/metrics", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Metrics endpoint error: {}", e);
    }
}
