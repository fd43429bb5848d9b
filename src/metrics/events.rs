//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the capture
//! pipeline. Events implement the `InternalEvent` trait which emits the
//! corresponding Prometheus metric.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Terminal status of a handled document.
#[derive(Debug, Clone, Copy)]
pub enum DocumentStatus {
    /// Recorded to the ledger.
    Recorded,
    /// Extraction succeeded but yielded no usable fields.
    Empty,
    /// Queued for retry after a recoverable failure.
    Queued,
    /// Lost before relocation completed.
    Abandoned,
}

impl DocumentStatus {
    fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Recorded => "recorded",
            DocumentStatus::Empty => "empty",
            DocumentStatus::Queued => "queued",
            DocumentStatus::Abandoned => "abandoned",
        }
    }
}

/// Stage at which a recoverable failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Offline,
    Upload,
    Extract,
    Record,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Offline => "offline",
            FailureStage::Upload => "upload",
            FailureStage::Extract => "extract",
            FailureStage::Record => "record",
        }
    }
}

/// Event emitted when a document reaches a terminal state.
pub struct DocumentProcessed {
    pub status: DocumentStatus,
}

impl InternalEvent for DocumentProcessed {
    fn emit(self) {
        trace!(status = self.status.as_str(), "Document processed");
        counter!("plume_documents_processed_total", "status" => self.status.as_str()).increment(1);
    }
}

/// Event emitted when a pipeline step fails recoverably.
pub struct DocumentFailed {
    pub stage: FailureStage,
}

impl InternalEvent for DocumentFailed {
    fn emit(self) {
        trace!(stage = self.stage.as_str(), "Document failed");
        counter!("plume_documents_failed_total", "stage" => self.stage.as_str()).increment(1);
    }
}

/// Event emitted when a document is detected in the spool.
pub struct DocumentDetected;

impl InternalEvent for DocumentDetected {
    fn emit(self) {
        trace!("Document detected");
        counter!("plume_documents_detected_total").increment(1);
    }
}

/// Event emitted when a record is appended to the ledger.
pub struct RecordAppended {
    pub count: u64,
}

impl InternalEvent for RecordAppended {
    fn emit(self) {
        trace!(count = self.count, "Record appended");
        counter!("plume_records_appended_total").increment(self.count);
    }
}

/// Event emitted after every queue persist with the current depth.
pub struct QueueDepth {
    pub count: usize,
}

impl InternalEvent for QueueDepth {
    fn emit(self) {
        trace!(count = self.count, "Queue depth");
        gauge!("plume_retry_queue_depth").set(self.count as f64);
    }
}

/// Event emitted when a queued item is resolved during a drain pass.
pub struct RetryResolved;

impl InternalEvent for RetryResolved {
    fn emit(self) {
        trace!("Retry resolved");
        counter!("plume_retries_resolved_total").increment(1);
    }
}

/// Event emitted when a queued item is dropped because its file vanished.
pub struct RetryDropped;

impl InternalEvent for RetryDropped {
    fn emit(self) {
        trace!("Retry dropped");
        counter!("plume_retries_dropped_total").increment(1);
    }
}

/// Event emitted when forwarding to the physical printer fails.
pub struct ForwardFailed;

impl InternalEvent for ForwardFailed {
    fn emit(self) {
        trace!("Forward failed");
        counter!("plume_forward_failures_total").increment(1);
    }
}

/// Event emitted when documents are purged by the retention pass.
pub struct DocumentsPurged {
    pub count: u64,
}

impl InternalEvent for DocumentsPurged {
    fn emit(self) {
        trace!(count = self.count, "Documents purged");
        counter!("plume_documents_purged_total").increment(self.count);
    }
}

/// Storage operation type.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
}

impl StorageOperation {
    fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
        }
    }
}

/// Storage request outcome.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted for each storage request.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "plume_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted with the duration of each storage request.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        histogram!(
            "plume_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
