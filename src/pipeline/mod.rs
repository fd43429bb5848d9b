//! Document ingestion pipeline.
//!
//! Drives each detected document through a strict step sequence:
//! relocate, forward to the physical printer, connectivity gate, upload,
//! extract, normalize, record. Any recoverable failure past relocation
//! lands the document in the durable retry queue, which is drained once
//! per tick while connectivity holds.
//!
//! # Architecture
//!
//! A single control flow consumes detection events from the spool watcher
//! and interleaves drain and retention ticks between them, so the retry
//! queue and the ledger are single-writer by construction.

mod signal;

use chrono::Local;
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::document::{Document, relocate};
use crate::emit;
use crate::error::{
    ExtractSnafu, LedgerSnafu, PipelineError, PipelineStorageSnafu,
};
use crate::extract::{AnalysisClient, FieldExtractor, normalize};
use crate::ledger::{CsvLedger, RecordSink};
use crate::metrics::events::{
    DocumentFailed, DocumentProcessed, DocumentStatus, FailureStage, RetryDropped, RetryResolved,
};
use crate::printer::PrinterForwarder;
use crate::probe::{ConnectivityProbe, TcpProbe};
use crate::queue::{PendingRetry, RetryQueue};
use crate::retention::purge_old_documents;
use crate::storage::{StorageProvider, StorageProviderRef, document_key};
use crate::watch::SpoolWatcher;

/// Statistics about a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub documents_detected: usize,
    pub documents_recorded: usize,
    pub documents_queued: usize,
    pub documents_abandoned: usize,
    pub empty_extractions: usize,
    pub retries_resolved: usize,
    pub retries_dropped: usize,
    pub documents_purged: u64,
}

/// Terminal outcome of the upload-through-record sequence.
enum RecordOutcome {
    /// A record was appended to the ledger.
    Recorded,
    /// Extraction succeeded but yielded no usable fields.
    Empty,
}

/// Main ingestion pipeline.
pub struct Pipeline {
    config: Config,
    storage: StorageProviderRef,
    extractor: Arc<dyn FieldExtractor>,
    sink: Arc<dyn RecordSink>,
    probe: Arc<dyn ConnectivityProbe>,
    forwarder: PrinterForwarder,
    queue: RetryQueue,
    stats: PipelineStats,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Create a pipeline with explicitly injected collaborators.
    pub fn new(
        config: Config,
        storage: StorageProviderRef,
        extractor: Arc<dyn FieldExtractor>,
        sink: Arc<dyn RecordSink>,
        probe: Arc<dyn ConnectivityProbe>,
        forwarder: PrinterForwarder,
        shutdown: CancellationToken,
    ) -> Self {
        let queue = RetryQueue::new(config.queue.path.clone());
        Self {
            config,
            storage,
            extractor,
            sink,
            probe,
            forwarder,
            queue,
            stats: PipelineStats::default(),
            shutdown,
        }
    }

    /// Create a pipeline with production collaborators built from config.
    pub async fn from_config(
        config: Config,
        shutdown: CancellationToken,
    ) -> Result<Self, PipelineError> {
        let storage = Arc::new(
            StorageProvider::for_url_with_options(
                &config.remote.url,
                config.remote.storage_options.clone(),
            )
            .await
            .context(PipelineStorageSnafu)?,
        );

        let extractor = Arc::new(AnalysisClient::new(
            &config.extraction,
            config.remote.url.clone(),
        ));
        let sink = Arc::new(CsvLedger::new(&config.ledger, storage.clone()));
        let probe = Arc::new(TcpProbe::new(&config.connectivity));
        let forwarder = PrinterForwarder::from_config(&config.printer).await;

        Ok(Self::new(
            config, storage, extractor, sink, probe, forwarder, shutdown,
        ))
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Run the pipeline until shutdown.
    ///
    /// Consumes detection events from the spool watcher and interleaves
    /// retry-queue drains and retention purges between them. Each document
    /// is processed to success-or-enqueue before the next event is taken.
    pub async fn run(&mut self) -> Result<PipelineStats, PipelineError> {
        info!("Starting ingestion pipeline");

        let shutdown = self.shutdown.clone();
        let mut watcher = SpoolWatcher::spawn(self.config.spool.clone(), shutdown.clone());

        let mut drain_tick = tokio::time::interval(self.config.queue.drain_interval());
        drain_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut purge_tick = tokio::time::interval(self.config.archive.purge_interval());
        purge_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping pipeline");
                    break;
                }

                event = watcher.rx.recv() => {
                    match event {
                        Some(path) => self.handle_document(&path).await,
                        None => {
                            warn!("Spool watcher channel closed unexpectedly");
                            break;
                        }
                    }
                }

                _ = drain_tick.tick() => {
                    self.drain_queue().await;
                }

                _ = purge_tick.tick() => {
                    self.stats.documents_purged += purge_old_documents(
                        &self.config.archive.path,
                        self.config.archive.retention_days,
                    )
                    .await;
                }
            }
        }

        watcher.abort();
        info!("Pipeline stopped: {:?}", self.stats);
        Ok(self.stats.clone())
    }

    /// Process one detected document to completion.
    ///
    /// No error escapes this handler: every failure path ends in either an
    /// enqueue (recoverable, past relocation) or a logged abandonment
    /// (relocation itself failed).
    pub async fn handle_document(&mut self, spool_path: &Path) {
        self.stats.documents_detected += 1;

        // Let the spooler finish flushing the file. A pragmatic guard
        // against partial-write races, not a correctness proof.
        tokio::time::sleep(self.config.spool.settle_delay()).await;

        // Recorded once at detection; reused verbatim on retry so the
        // remote key namespace stays stable across attempts.
        let created_time = crate::queue::format_created_time(Local::now());

        let canonical_path = match relocate(spool_path, &self.config.archive.path).await {
            Ok(path) => path,
            Err(e) => {
                // The queue entry format depends on relocation having
                // succeeded, so a pre-relocation failure cannot be queued.
                error!(
                    "Failed to relocate {}, abandoning document: {}",
                    spool_path.display(),
                    e
                );
                self.stats.documents_abandoned += 1;
                emit!(DocumentProcessed {
                    status: DocumentStatus::Abandoned
                });
                return;
            }
        };
        info!("Moved document to: {}", canonical_path.display());

        let doc = Document {
            canonical_path,
            created_time,
        };

        self.forwarder.forward(&doc.canonical_path).await;

        if !self.probe.is_connected().await {
            error!("Offline, queueing {} for retry", doc.canonical_path.display());
            emit!(DocumentFailed {
                stage: FailureStage::Offline
            });
            self.enqueue(&doc).await;
            return;
        }

        match self.record_document(&doc).await {
            Ok(RecordOutcome::Recorded) => {
                self.stats.documents_recorded += 1;
                emit!(DocumentProcessed {
                    status: DocumentStatus::Recorded
                });
            }
            Ok(RecordOutcome::Empty) => {
                warn!(
                    "No usable data extracted from {}",
                    doc.canonical_path.display()
                );
                self.stats.empty_extractions += 1;
                emit!(DocumentProcessed {
                    status: DocumentStatus::Empty
                });
            }
            Err((stage, e)) => {
                error!(
                    "Error processing {} at {} stage: {}",
                    doc.canonical_path.display(),
                    stage.as_str(),
                    e
                );
                emit!(DocumentFailed { stage });
                self.enqueue(&doc).await;
            }
        }
    }

    /// Upload, extract, normalize, and record one document.
    ///
    /// Shared between fresh ingestion and retry; the caller routes any
    /// error to the enqueue (or keep-queued) step.
    async fn record_document(
        &self,
        doc: &Document,
    ) -> Result<RecordOutcome, (FailureStage, PipelineError)> {
        let key = document_key(&doc.created_time, &doc.filename());

        self.storage
            .upload_file(&doc.canonical_path, &key)
            .await
            .context(PipelineStorageSnafu)
            .map_err(|e| (FailureStage::Upload, e))?;
        info!("Uploaded to remote storage: {}", key);

        let kvs = self
            .extractor
            .analyze(&key)
            .await
            .context(ExtractSnafu)
            .map_err(|e| (FailureStage::Extract, e))?;

        let fields = normalize(&kvs);
        if !fields.has_data() {
            return Ok(RecordOutcome::Empty);
        }

        self.sink
            .append(&fields)
            .await
            .context(LedgerSnafu)
            .map_err(|e| (FailureStage::Record, e))?;

        Ok(RecordOutcome::Recorded)
    }

    /// Append a document to the retry queue and persist immediately.
    async fn enqueue(&mut self, doc: &Document) {
        let item = PendingRetry::new(
            doc.canonical_path.display().to_string(),
            doc.created_time.clone(),
        );

        match self.queue.push(item).await {
            Ok(()) => {
                self.stats.documents_queued += 1;
                emit!(DocumentProcessed {
                    status: DocumentStatus::Queued
                });
                info!("Queued for retry: {}", doc.canonical_path.display());
            }
            Err(e) => {
                // The document survives on disk, but nothing will retry it.
                error!(
                    "Failed to persist retry queue, {} will not be retried: {}",
                    doc.canonical_path.display(),
                    e
                );
            }
        }
    }

    /// One full drain pass over the retry queue.
    ///
    /// Skipped entirely while offline. Per-item failures never abort the
    /// remaining items; the rebuilt still-failed set replaces the queue
    /// wholesale at the end of the pass.
    pub async fn drain_queue(&mut self) {
        if !self.probe.is_connected().await {
            return;
        }

        let items = match self.queue.load().await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to load retry queue: {}", e);
                return;
            }
        };
        if items.is_empty() {
            return;
        }
        debug!("Draining retry queue: {} items", items.len());

        let mut still_failed = Vec::new();
        for item in items {
            let path = PathBuf::from(&item.path);
            let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
            if !exists {
                warn!("File not found for retry, dropping: {}", item.path);
                self.stats.retries_dropped += 1;
                emit!(RetryDropped);
                continue;
            }

            let doc = Document {
                canonical_path: path,
                created_time: item.created_time.clone(),
            };

            match self.record_document(&doc).await {
                Ok(RecordOutcome::Recorded) => {
                    self.stats.documents_recorded += 1;
                    self.stats.retries_resolved += 1;
                    emit!(RetryResolved);
                    emit!(DocumentProcessed {
                        status: DocumentStatus::Recorded
                    });
                }
                Ok(RecordOutcome::Empty) => {
                    warn!("No usable data extracted from retry of {}", item.path);
                    self.stats.empty_extractions += 1;
                    self.stats.retries_resolved += 1;
                    emit!(RetryResolved);
                    emit!(DocumentProcessed {
                        status: DocumentStatus::Empty
                    });
                }
                Err((stage, e)) => {
                    error!("Retry failed for {} at {} stage: {}", item.path, stage.as_str(), e);
                    emit!(DocumentFailed { stage });
                    still_failed.push(item);
                }
            }
        }

        if let Err(e) = self.queue.save(&still_failed).await {
            error!("Failed to persist retry queue after drain: {}", e);
        }
    }
}

/// Run the pipeline with the given configuration.
pub async fn run_pipeline(config: Config) -> Result<PipelineStats, PipelineError> {
    let shutdown = CancellationToken::new();

    // Set up signal handler for graceful shutdown
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            signal::shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let mut pipeline = Pipeline::from_config(config, shutdown).await?;
    pipeline.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stats_default() {
        let stats = PipelineStats::default();
        assert_eq!(stats.documents_detected, 0);
        assert_eq!(stats.documents_recorded, 0);
        assert_eq!(stats.retries_resolved, 0);
    }
}
