//! Plume: virtual-printer capture daemon.
//!
//! This crate handles:
//! - Watching a spool directory for documents produced by a virtual printer
//! - Relocating captures into a date-partitioned archive
//! - Forwarding each capture to a physical printer
//! - Uploading captures to remote object storage (S3, local)
//! - Extracting invoice fields via an analysis service and recording them
//!   to a CSV ledger with a remote mirror
//! - A durable retry queue for documents that failed while offline

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod printer;
pub mod probe;
pub mod queue;
pub mod retention;
pub mod storage;
pub mod tracing;
pub mod watch;

// Re-export commonly used items
pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineStats, run_pipeline};
pub use storage::{StorageProvider, StorageProviderRef};
pub use crate::tracing::init_tracing;
