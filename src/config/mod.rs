//! Configuration parsing and validation.
//!
//! Handles loading configuration from YAML files with environment variable
//! interpolation and default values for every optional knob.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{
    ConfigError, EmptyArchiveDirSnafu, EmptyRemoteUrlSnafu, EmptySpoolDirSnafu,
    EnvInterpolationSnafu, ReadFileSnafu, YamlParseSnafu,
};

/// Main configuration structure for the capture daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub spool: SpoolConfig,
    pub archive: ArchiveConfig,
    pub remote: RemoteConfig,
    pub extraction: ExtractionConfig,
    pub ledger: LedgerConfig,
    /// Physical printer forwarding (optional, skipped when unset).
    #[serde(default)]
    pub printer: PrinterConfig,
    /// Retry queue configuration (optional).
    #[serde(default)]
    pub queue: QueueConfig,
    /// Connectivity probe configuration (optional).
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    /// Metrics configuration (optional, enabled by default).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Spool directory configuration: where rendered print jobs land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Directory watched for new documents.
    pub path: PathBuf,

    /// File extension that triggers processing (default: "pdf").
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Interval in milliseconds between spool directory scans (default: 500).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay in milliseconds before touching a newly detected file,
    /// letting the spooler finish flushing it (default: 1000).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_extension() -> String {
    "pdf".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_settle_ms() -> u64 {
    1000
}

impl SpoolConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Archive configuration: where documents live after relocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Root of the date-partitioned archive tree.
    pub path: PathBuf,

    /// Days to retain archived documents before purging (default: 7).
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Interval in seconds between retention purge passes (default: 3600).
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

fn default_retention_days() -> u64 {
    7
}

fn default_purge_interval_secs() -> u64 {
    3600
}

impl ArchiveConfig {
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

/// Remote storage configuration for uploaded documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Storage URL for document uploads.
    /// Examples: "s3://bucket/documents", "/local/path/documents"
    pub url: String,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Field extraction service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Base URL of the document-analysis service.
    pub endpoint: String,

    /// Optional API key sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_extraction_timeout_secs() -> u64 {
    30
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ledger configuration: the local tabular log and its remote mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to the local CSV ledger file.
    pub path: PathBuf,

    /// Remote key prefix the ledger is mirrored under (default: "ledger_logs").
    #[serde(default = "default_mirror_prefix")]
    pub mirror_prefix: String,
}

fn default_mirror_prefix() -> String {
    "ledger_logs".to_string()
}

/// Physical printer forwarding configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterConfig {
    /// Device name to forward documents to. When unset and `auto_detect`
    /// is enabled, the first suitable printer reported by CUPS is used.
    #[serde(default)]
    pub device: Option<String>,

    /// Name of the virtual capture printer, excluded from auto-detection.
    #[serde(default)]
    pub virtual_name: Option<String>,

    /// Auto-detect a physical printer when no device is configured.
    #[serde(default)]
    pub auto_detect: bool,
}

/// Retry queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Path to the persisted queue file (default: "failed_uploads.json").
    #[serde(default = "default_queue_path")]
    pub path: PathBuf,

    /// Interval in seconds between drain passes (default: 1).
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: default_queue_path(),
            drain_interval_secs: default_drain_interval_secs(),
        }
    }
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("failed_uploads.json")
}

fn default_drain_interval_secs() -> u64 {
    1
}

impl QueueConfig {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }
}

/// Connectivity probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Well-known address probed to decide whether the network is up
    /// (default: "8.8.8.8:53").
    #[serde(default = "default_probe_address")]
    pub address: String,

    /// Probe timeout in seconds (default: 3).
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            address: default_probe_address(),
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_probe_address() -> String {
    "8.8.8.8:53".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    3
}

impl ConnectivityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_options(path, true)
    }

    /// Load configuration from a YAML file with optional environment variable
    /// interpolation.
    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        interpolate_env: bool,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;

        let content = if interpolate_env {
            let result = vars::interpolate(&content);
            if !result.is_ok() {
                let error_msg = result.errors.join("\n");
                return EnvInterpolationSnafu { message: error_msg }.fail();
            }
            result.text
        } else {
            content
        };

        let config: Config = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.spool.path.as_os_str().is_empty(), EmptySpoolDirSnafu);
        ensure!(
            !self.archive.path.as_os_str().is_empty(),
            EmptyArchiveDirSnafu
        );
        ensure!(!self.remote.url.is_empty(), EmptyRemoteUrlSnafu);
        Ok(())
    }
}
