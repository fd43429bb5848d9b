//! Spool directory watcher.
//!
//! Scans the spool directory on a fixed interval and pushes newly appeared
//! document paths onto a channel. The pipeline consumes the channel; the
//! watcher never touches file contents. Sub-directories are ignored.

use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SpoolConfig;
use crate::emit;
use crate::metrics::events::DocumentDetected;

/// Handle to the background watcher task.
pub struct SpoolWatcher {
    pub rx: mpsc::Receiver<PathBuf>,
    handle: JoinHandle<()>,
}

impl SpoolWatcher {
    /// Spawn the watcher task.
    pub fn spawn(config: SpoolConfig, shutdown: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(watch_loop(config, tx, shutdown));
        Self { rx, handle }
    }

    /// Abort the watcher task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

async fn watch_loop(config: SpoolConfig, tx: mpsc::Sender<PathBuf>, shutdown: CancellationToken) {
    if let Err(e) = tokio::fs::create_dir_all(&config.path).await {
        warn!(
            "Failed to create spool directory {}: {}",
            config.path.display(),
            e
        );
    }
    info!("Watching for documents in: {}", config.path.display());

    // Everything present at startup counts as new: the daemon may have
    // restarted while jobs sat in the spool.
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut interval = tokio::time::interval(config.poll_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Spool watcher stopping");
                return;
            }
            _ = interval.tick() => {}
        }

        let detected = scan(&config, &mut seen).await;
        for path in detected {
            emit!(DocumentDetected);
            debug!("Detected document: {}", path.display());
            if tx.send(path).await.is_err() {
                // Pipeline went away; nothing left to do.
                return;
            }
        }
    }
}

/// Scan the spool directory once, returning paths not seen before.
///
/// Prunes `seen` entries whose file vanished (relocated or deleted) so the
/// set stays bounded by the spool's live contents.
async fn scan(config: &SpoolConfig, seen: &mut HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut current: HashSet<PathBuf> = HashSet::new();
    let mut detected = Vec::new();

    let mut entries = match tokio::fs::read_dir(&config.path).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read spool directory: {}", e);
            return detected;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();

        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        let matches_extension = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case(config.extension.as_str()))
            .unwrap_or(false);
        if !matches_extension {
            continue;
        }

        current.insert(path.clone());
        if !seen.contains(&path) {
            detected.push(path);
        }
    }

    *seen = current;
    detected.sort();
    detected
}
