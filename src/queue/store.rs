//! Persisted retry queue implementation.
//!
//! Callers always load the full set, mutate in memory, and save the full
//! set back. The file is never partially written from the caller's
//! perspective; concurrent external mutation is not supported.

use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::emit;
use crate::error::{QueueError, QueueParseSnafu, QueueReadSnafu, QueueSerializeSnafu,
    QueueWriteSnafu};
use crate::metrics::events::QueueDepth;

use super::PendingRetry;

/// Durable retry queue owning its file path.
#[derive(Debug, Clone)]
pub struct RetryQueue {
    path: PathBuf,
}

impl RetryQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full persisted collection.
    ///
    /// Returns an empty vec when no queue file exists yet.
    pub async fn load(&self) -> Result<Vec<PendingRetry>, QueueError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).context(QueueReadSnafu {
                    path: self.path.display().to_string(),
                });
            }
        };

        serde_json::from_str(&content).context(QueueParseSnafu {
            path: self.path.display().to_string(),
        })
    }

    /// Overwrite the persisted file with the given collection.
    ///
    /// Pretty-formatted so operators can inspect pending retries directly.
    pub async fn save(&self, items: &[PendingRetry]) -> Result<(), QueueError> {
        let json = serde_json::to_string_pretty(items).context(QueueSerializeSnafu)?;
        tokio::fs::write(&self.path, json)
            .await
            .context(QueueWriteSnafu {
                path: self.path.display().to_string(),
            })?;

        debug!("Persisted retry queue: {} items", items.len());
        emit!(QueueDepth { count: items.len() });
        Ok(())
    }

    /// Append one item and persist immediately.
    pub async fn push(&self, item: PendingRetry) -> Result<(), QueueError> {
        let mut items = self.load().await?;
        items.push(item);
        self.save(&items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn queue_in(dir: &TempDir) -> RetryQueue {
        RetryQueue::new(dir.path().join("failed_uploads.json"))
    }

    #[tokio::test]
    async fn test_load_absent_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir);

        let items = queue.load().await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir);

        let items = vec![
            PendingRetry::new("/archive/2024/05/01/a.pdf", "2024-05-01_09-00-00"),
            PendingRetry::new("/archive/2024/05/01/b.pdf", "2024-05-01_09-05-00"),
        ];
        queue.save(&items).await.unwrap();

        let loaded = queue.load().await.unwrap();
        assert_eq!(loaded, items);
    }

    #[tokio::test]
    async fn test_push_appends_and_persists() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir);

        queue
            .push(PendingRetry::new("/archive/a.pdf", "2024-05-01_09-00-00"))
            .await
            .unwrap();
        queue
            .push(PendingRetry::new("/archive/b.pdf", "2024-05-01_09-05-00"))
            .await
            .unwrap();

        let loaded = queue.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].path, "/archive/b.pdf");
    }

    #[tokio::test]
    async fn test_save_is_pretty_formatted() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir);

        queue
            .save(&[PendingRetry::new("/archive/a.pdf", "2024-05-01_09-00-00")])
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(queue.path()).await.unwrap();
        // Multi-line output with indentation, not a single compact line
        assert!(raw.lines().count() > 1);
        assert!(raw.contains("  "));
    }

    #[tokio::test]
    async fn test_save_replaces_wholesale() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir);

        queue
            .save(&[
                PendingRetry::new("/archive/a.pdf", "2024-05-01_09-00-00"),
                PendingRetry::new("/archive/b.pdf", "2024-05-01_09-05-00"),
            ])
            .await
            .unwrap();
        queue.save(&[]).await.unwrap();

        let loaded = queue.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir);

        tokio::fs::write(queue.path(), "not json").await.unwrap();
        let result = queue.load().await;
        assert!(matches!(result, Err(QueueError::QueueParse { .. })));
    }
}
