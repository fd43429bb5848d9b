//! Physical printer forwarding.
//!
//! Forwarding is fire-and-forget: a failed submission is logged and counted
//! but never blocks or fails the document pipeline. Discovery failures
//! degrade to "forwarding skipped" with a warning.

use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::PrinterConfig;
use crate::emit;
use crate::metrics::events::ForwardFailed;

/// Forwards relocated documents to a physical printer via the print
/// subsystem (`lp`).
pub struct PrinterForwarder {
    device: Option<String>,
}

impl PrinterForwarder {
    /// Resolve the forwarding target from configuration.
    ///
    /// Uses the configured device when present, otherwise attempts
    /// auto-detection if enabled. A `None` device means forwarding is
    /// skipped for every document.
    pub async fn from_config(config: &PrinterConfig) -> Self {
        let device = match &config.device {
            Some(device) => Some(device.clone()),
            None if config.auto_detect => {
                detect_physical_printer(config.virtual_name.as_deref()).await
            }
            None => None,
        };

        match &device {
            Some(d) => info!("Forwarding documents to printer: {}", d),
            None => warn!("No physical printer configured. Skipping forwarding."),
        }

        Self { device }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { device: None }
    }

    /// Submit a document to the physical printer. Fire-and-forget.
    pub async fn forward(&self, path: &Path) {
        let Some(device) = &self.device else {
            return;
        };

        let result = Command::new("lp")
            .arg("-d")
            .arg(device)
            .arg(path)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                info!("Forwarded to printer {}: {}", device, path.display());
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    "Printer submission failed for {}: {}",
                    path.display(),
                    stderr.trim()
                );
                emit!(ForwardFailed);
            }
            Err(e) => {
                warn!("Failed to invoke lp for {}: {}", path.display(), e);
                emit!(ForwardFailed);
            }
        }
    }
}

/// Find a physical printer via `lpstat -p`, excluding the virtual capture
/// device and anything that looks like a PDF printer. Prefers an idle
/// printer; falls back to the first acceptable one.
async fn detect_physical_printer(exclude: Option<&str>) -> Option<String> {
    let output = match Command::new("lpstat").arg("-p").output().await {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => {
            warn!("lpstat unavailable; printer auto-detection skipped");
            return None;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let printers = parse_lpstat(&stdout, exclude);

    printers
        .iter()
        .find(|(_, idle)| *idle)
        .or_else(|| printers.first())
        .map(|(name, _)| name.clone())
}

/// Parse `lpstat -p` output into (name, is_idle) pairs, filtered.
///
/// Lines look like: `printer HP-LaserJet is idle.  enabled since ...`
fn parse_lpstat(stdout: &str, exclude: Option<&str>) -> Vec<(String, bool)> {
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("printer ")?;
            let name = rest.split_whitespace().next()?;
            if Some(name) == exclude || name.to_uppercase().contains("PDF") {
                return None;
            }
            let idle = rest.contains("is idle");
            Some((name.to_string(), idle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LPSTAT_OUTPUT: &str = "\
printer Virtual-PDF is idle.  enabled since Mon 01 Apr 2024
printer HP-LaserJet-1020 is idle.  enabled since Mon 01 Apr 2024
printer Epson-WF disabled since Mon 01 Apr 2024
printer plume is idle.  enabled since Mon 01 Apr 2024
";

    #[test]
    fn test_parse_excludes_pdf_and_virtual_device() {
        let printers = parse_lpstat(LPSTAT_OUTPUT, Some("plume"));
        let names: Vec<&str> = printers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["HP-LaserJet-1020", "Epson-WF"]);
    }

    #[test]
    fn test_idle_printer_preferred() {
        let printers = parse_lpstat(LPSTAT_OUTPUT, Some("plume"));
        let chosen = printers
            .iter()
            .find(|(_, idle)| *idle)
            .or_else(|| printers.first())
            .map(|(name, _)| name.clone());
        assert_eq!(chosen.as_deref(), Some("HP-LaserJet-1020"));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_lpstat("", None).is_empty());
    }

    #[tokio::test]
    async fn test_forward_without_device_is_noop() {
        let forwarder = PrinterForwarder::disabled();
        // Must not error or panic
        forwarder.forward(Path::new("/nonexistent/doc.pdf")).await;
    }
}
