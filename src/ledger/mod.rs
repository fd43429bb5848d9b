//! Persistent tabular ledger of extracted invoice records.
//!
//! Appends one CSV row per recorded document and mirrors the updated table
//! to remote storage under a date-partitioned log key.

use async_trait::async_trait;
use chrono::Local;
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::{error, info};

use crate::config::LedgerConfig;
use crate::emit;
use crate::error::{
    LedgerAppendSnafu, LedgerDirSnafu, LedgerError, LedgerMirrorSnafu, LedgerSerializeSnafu,
};
use crate::extract::InvoiceFields;
use crate::metrics::events::RecordAppended;
use crate::storage::StorageProviderRef;

/// Boundary trait for the record sink collaborator.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Append one canonical record to the persistent table.
    async fn append(&self, record: &InvoiceFields) -> Result<(), LedgerError>;
}

/// CSV-backed ledger with a remote mirror.
///
/// The local table is authoritative. Append-then-mirror is a non-atomic
/// sequence over a shared file; the pipeline is single-writer by
/// construction so no locking is taken here.
pub struct CsvLedger {
    path: PathBuf,
    mirror_prefix: String,
    storage: StorageProviderRef,
}

impl CsvLedger {
    pub fn new(config: &LedgerConfig, storage: StorageProviderRef) -> Self {
        Self {
            path: config.path.clone(),
            mirror_prefix: config.mirror_prefix.clone(),
            storage,
        }
    }

    /// Remote key the table is mirrored under for the given date.
    fn mirror_key(&self, date: &str) -> String {
        let filename = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger.csv".to_string());
        format!("{}/{}/{}", self.mirror_prefix, date, filename)
    }

    fn append_row(&self, record: &InvoiceFields) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(LedgerDirSnafu {
                path: parent.display().to_string(),
            })?;
        }

        // Write the header only when starting a fresh table.
        let exists = self.path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(LedgerAppendSnafu {
                path: self.path.display().to_string(),
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);
        writer.serialize(record).context(LedgerSerializeSnafu)?;
        writer
            .flush()
            .map_err(csv::Error::from)
            .context(LedgerSerializeSnafu)?;

        Ok(())
    }

    /// Mirror the whole table to remote storage under today's log key.
    async fn mirror(&self) -> Result<(), LedgerError> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let key = self.mirror_key(&date);
        self.storage
            .upload_file(&self.path, &key)
            .await
            .context(LedgerMirrorSnafu { key: key.clone() })?;
        info!("Ledger mirrored to remote storage as {}", key);
        Ok(())
    }
}

#[async_trait]
impl RecordSink for CsvLedger {
    async fn append(&self, record: &InvoiceFields) -> Result<(), LedgerError> {
        self.append_row(record)?;
        info!("Ledger updated: {}", self.path.display());
        emit!(RecordAppended { count: 1 });

        // A mirror failure does not fail the append: the local table is
        // authoritative and the next append re-mirrors it.
        if let Err(e) = self.mirror().await {
            error!("{e}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageProvider;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fields(invoice_number: &str) -> InvoiceFields {
        InvoiceFields {
            invoice_number: invoice_number.to_string(),
            ..Default::default()
        }
    }

    async fn ledger_in(local: &TempDir, remote: &TempDir) -> CsvLedger {
        let storage = Arc::new(
            StorageProvider::for_url(remote.path().to_str().unwrap())
                .await
                .unwrap(),
        );
        let config = LedgerConfig {
            path: local.path().join("invoices.csv"),
            mirror_prefix: "ledger_logs".to_string(),
        };
        CsvLedger::new(&config, storage)
    }

    #[tokio::test]
    async fn test_append_writes_header_once() {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let ledger = ledger_in(&local, &remote).await;

        ledger.append(&fields("INV-1")).await.unwrap();
        ledger.append(&fields("INV-2")).await.unwrap();

        let content = std::fs::read_to_string(local.path().join("invoices.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Invoice Number,"));
        assert!(lines[1].starts_with("INV-1,"));
        assert!(lines[2].starts_with("INV-2,"));
    }

    #[tokio::test]
    async fn test_append_mirrors_to_remote() {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let ledger = ledger_in(&local, &remote).await;

        ledger.append(&fields("INV-1")).await.unwrap();

        let date = Local::now().format("%Y-%m-%d").to_string();
        let mirrored = remote
            .path()
            .join("ledger_logs")
            .join(&date)
            .join("invoices.csv");
        let content = std::fs::read_to_string(mirrored).unwrap();
        assert!(content.contains("INV-1"));
    }

    #[tokio::test]
    async fn test_append_survives_mirror_failure() {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let remote_path = remote.path().to_path_buf();
        let ledger = ledger_in(&local, &remote).await;

        // Make the mirror target unusable
        drop(remote);
        assert!(!remote_path.exists());

        ledger.append(&fields("INV-1")).await.unwrap();
        let content = std::fs::read_to_string(local.path().join("invoices.csv")).unwrap();
        assert!(content.contains("INV-1"));
    }

    #[tokio::test]
    async fn test_mirror_failure_names_the_key() {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let ledger = ledger_in(&local, &remote).await;

        // No local table yet, so the mirror's read must fail
        let err = ledger.mirror().await.unwrap_err();
        match err {
            LedgerError::LedgerMirror { key, .. } => {
                assert!(key.starts_with("ledger_logs/"));
                assert!(key.ends_with("/invoices.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_mirror_key_layout() {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        let ledger = ledger_in(&local, &remote).await;

        assert_eq!(
            ledger.mirror_key("2024-05-01"),
            "ledger_logs/2024-05-01/invoices.csv"
        );
    }
}
