//! Error types for plume using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// IO error while reading a local file for upload.
    #[snafu(display("IO error for {path}"))]
    Io {
        source: std::io::Error,
        path: String,
    },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Spool directory is empty.
    #[snafu(display("Spool directory cannot be empty"))]
    EmptySpoolDir,

    /// Archive directory is empty.
    #[snafu(display("Archive directory cannot be empty"))]
    EmptyArchiveDir,

    /// Remote storage URL is empty.
    #[snafu(display("Remote storage URL cannot be empty"))]
    EmptyRemoteUrl,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Queue Errors ============

/// Errors that can occur while persisting the retry queue.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum QueueError {
    /// Failed to read the queue file.
    #[snafu(display("Failed to read queue file {path}"))]
    QueueRead {
        source: std::io::Error,
        path: String,
    },

    /// Failed to write the queue file.
    #[snafu(display("Failed to write queue file {path}"))]
    QueueWrite {
        source: std::io::Error,
        path: String,
    },

    /// Queue file contents are not valid JSON.
    #[snafu(display("Queue file {path} is corrupt"))]
    QueueParse {
        source: serde_json::Error,
        path: String,
    },

    /// Failed to serialize queue entries.
    #[snafu(display("Failed to serialize queue entries"))]
    QueueSerialize { source: serde_json::Error },
}

// ============ Extraction Errors ============

/// Errors that can occur during field extraction.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExtractError {
    /// The analysis request could not be sent.
    #[snafu(display("Analysis request failed for {key}"))]
    Request { source: reqwest::Error, key: String },

    /// The analysis service returned a non-success status.
    #[snafu(display("Analysis service returned {status} for {key}"))]
    ServiceStatus { status: u16, key: String },

    /// The analysis response could not be decoded.
    #[snafu(display("Failed to decode analysis response for {key}"))]
    ResponseDecode { source: reqwest::Error, key: String },
}

// ============ Ledger Errors ============

/// Errors that can occur while appending to the ledger table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LedgerError {
    /// Failed to create the ledger directory.
    #[snafu(display("Failed to create ledger directory {path}"))]
    LedgerDir {
        source: std::io::Error,
        path: String,
    },

    /// Failed to open or append to the ledger file.
    #[snafu(display("Failed to append to ledger {path}"))]
    LedgerAppend {
        source: std::io::Error,
        path: String,
    },

    /// CSV serialization failed.
    #[snafu(display("Failed to serialize ledger row"))]
    LedgerSerialize { source: csv::Error },

    /// Failed to mirror the ledger to remote storage.
    #[snafu(display("Failed to mirror ledger to {key}"))]
    LedgerMirror { source: StorageError, key: String },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

// ============ Pipeline Error (top-level) ============

/// Top-level pipeline errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Storage error.
    #[snafu(display("Storage error"))]
    PipelineStorage { source: StorageError },

    /// Field extraction error.
    #[snafu(display("Extraction error"))]
    Extract { source: ExtractError },

    /// Ledger error.
    #[snafu(display("Ledger error"))]
    Ledger { source: LedgerError },
}
