//! Retention purge for the document archive.
//!
//! Walks the date-partitioned archive tree and deletes documents whose
//! modification time is older than the retention window. Per-file errors
//! are logged and skipped; the pass always runs to completion.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info};

use crate::emit;
use crate::metrics::events::DocumentsPurged;

/// Delete archived documents older than `retention_days`.
///
/// Returns the number of documents removed.
pub async fn purge_old_documents(archive_root: &Path, retention_days: u64) -> u64 {
    let cutoff = SystemTime::now() - Duration::from_secs(retention_days * 86_400);
    let root = archive_root.to_path_buf();

    // The walk is synchronous directory traversal; keep it off the runtime.
    let removed = tokio::task::spawn_blocking(move || purge_tree(&root, cutoff))
        .await
        .unwrap_or(0);

    if removed > 0 {
        info!("Retention purge removed {} documents", removed);
        emit!(DocumentsPurged { count: removed });
    }
    removed
}

fn purge_tree(dir: &Path, cutoff: SystemTime) -> u64 {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to read {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            removed += purge_tree(&path, cutoff);
            continue;
        }

        match expired(&path, cutoff) {
            Ok(true) => match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!("Deleted old document: {}", path.display());
                    removed += 1;
                }
                Err(e) => error!("Error deleting {}: {}", path.display(), e),
            },
            Ok(false) => {}
            Err(e) => error!("Error inspecting {}: {}", path.display(), e),
        }
    }
    removed
}

fn expired(path: &Path, cutoff: SystemTime) -> Result<bool, std::io::Error> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified < cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn age(path: &Path, days: u64) {
        let mtime = SystemTime::now() - Duration::from_secs(days * 86_400);
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let archive = TempDir::new().unwrap();
        let dated = archive.path().join("2024/04/01");
        std::fs::create_dir_all(&dated).unwrap();

        let old = dated.join("old.pdf");
        let fresh = dated.join("fresh.pdf");
        std::fs::write(&old, b"x").unwrap();
        std::fs::write(&fresh, b"x").unwrap();
        age(&old, 10);

        let removed = purge_old_documents(archive.path(), 7).await;
        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_purge_walks_nested_partitions() {
        let archive = TempDir::new().unwrap();
        for day in ["2024/03/30", "2024/03/31"] {
            let dir = archive.path().join(day);
            std::fs::create_dir_all(&dir).unwrap();
            let file = dir.join("doc.pdf");
            std::fs::write(&file, b"x").unwrap();
            age(&file, 30);
        }

        let removed = purge_old_documents(archive.path(), 7).await;
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_purge_missing_root_is_quiet() {
        let archive = TempDir::new().unwrap();
        let missing = archive.path().join("never-created");
        assert_eq!(purge_old_documents(&missing, 7).await, 0);
    }
}
