//! Captured document model and relocation.
//!
//! A document is owned exclusively by the pipeline from the moment its
//! detection event fires until it has been relocated to its canonical,
//! date-partitioned path. Relocation happens before any remote operation so
//! a later retry can always locate the document by path alone.

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A document relocated to its canonical archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Canonical (post-relocation) path under the archive tree.
    pub canonical_path: PathBuf,
    /// Detection timestamp, formatted `%Y-%m-%d_%H-%M-%S`.
    pub created_time: String,
}

impl Document {
    /// Original filename component of the canonical path.
    pub fn filename(&self) -> String {
        self.canonical_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Derive the canonical filename for a spooled document.
///
/// The spooler appends a disambiguating suffix after a double-underscore
/// marker (`invoice__dup123.pdf`); everything after the marker is stripped
/// while the extension is preserved.
pub fn canonical_name(raw_name: &str) -> String {
    let path = Path::new(raw_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| raw_name.to_string());

    let clean_stem = match stem.split_once("__") {
        Some((before, _)) => before.to_string(),
        None => stem,
    };

    match path.extension() {
        Some(ext) => format!("{}.{}", clean_stem, ext.to_string_lossy()),
        None => clean_stem,
    }
}

/// Move a spooled file to its canonical date-partitioned archive path.
///
/// Creates `{archive_root}/{YYYY}/{MM}/{DD}/` if absent, moves the file
/// there under its canonical name, and normalizes the file mode to 0o644.
pub async fn relocate(
    spool_path: &Path,
    archive_root: &Path,
) -> Result<PathBuf, std::io::Error> {
    relocate_on(spool_path, archive_root, Local::now().date_naive()).await
}

async fn relocate_on(
    spool_path: &Path,
    archive_root: &Path,
    date: NaiveDate,
) -> Result<PathBuf, std::io::Error> {
    let raw_name = spool_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = canonical_name(&raw_name);

    let dated_dir = archive_root.join(date.format("%Y/%m/%d").to_string());
    tokio::fs::create_dir_all(&dated_dir).await?;

    let dest = dated_dir.join(name);
    move_file(spool_path, &dest).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o644)).await?;
    }

    debug!("Relocated {} -> {}", spool_path.display(), dest.display());
    Ok(dest)
}

/// Rename, falling back to copy+remove when source and destination live on
/// different filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canonical_name_strips_spooler_suffix() {
        assert_eq!(canonical_name("invoice__dup123.pdf"), "invoice.pdf");
        assert_eq!(canonical_name("report__a__b.pdf"), "report.pdf");
    }

    #[test]
    fn test_canonical_name_without_marker_is_unchanged() {
        assert_eq!(canonical_name("invoice.pdf"), "invoice.pdf");
        assert_eq!(canonical_name("no_extension"), "no_extension");
    }

    #[tokio::test]
    async fn test_relocate_moves_into_dated_tree() {
        let spool = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();

        let src = spool.path().join("invoice__dup123.pdf");
        tokio::fs::write(&src, b"%PDF-1.4").await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let dest = relocate_on(&src, archive.path(), date).await.unwrap();

        assert_eq!(
            dest,
            archive.path().join("2024").join("05").join("01").join("invoice.pdf")
        );
        assert!(dest.exists());
        assert!(!src.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relocate_normalizes_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let spool = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();

        let src = spool.path().join("doc.pdf");
        tokio::fs::write(&src, b"%PDF-1.4").await.unwrap();
        tokio::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o600))
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let dest = relocate_on(&src, archive.path(), date).await.unwrap();

        let mode = tokio::fs::metadata(&dest).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn test_relocate_missing_source_fails() {
        let spool = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();

        let src = spool.path().join("ghost.pdf");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let result = relocate_on(&src, archive.path(), date).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_document_filename() {
        let doc = Document {
            canonical_path: PathBuf::from("/archive/2024/05/01/invoice.pdf"),
            created_time: "2024-05-01_09-30-15".to_string(),
        };
        assert_eq!(doc.filename(), "invoice.pdf");
    }
}
