//! Plume CLI: virtual-printer capture daemon.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use plume::{Config, init_tracing, run_pipeline};

#[derive(Parser, Debug)]
#[command(version)]
struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    info!("Loading config from {}", args.config.display());

    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Starting plume capture daemon ({} -> {})",
        config.spool.path.display(),
        config.remote.url
    );

    if config.metrics.enabled {
        let addr: SocketAddr = match config.metrics.address.parse() {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Invalid metrics address {}: {e}", config.metrics.address);
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = plume::metrics::init(addr) {
            eprintln!("Failed to start metrics server: {e}");
            return ExitCode::FAILURE;
        }
    }

    match run_pipeline(config).await {
        Ok(stats) => {
            info!(
                "Shutdown complete: {} detected, {} recorded, {} queued",
                stats.documents_detected, stats.documents_recorded, stats.documents_queued
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
