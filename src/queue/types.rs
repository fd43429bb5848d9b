//! Retry queue entry types.

use serde::{Deserialize, Serialize};

/// Timestamp format recorded for each captured document, second precision.
pub(crate) const CREATED_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A queue entry for a document that failed somewhere past relocation.
///
/// `created_time` is the detection timestamp recorded when the document was
/// first handled. It is reused verbatim on retry so the remote storage key
/// stays stable across attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRetry {
    /// Canonical (post-relocation) document path.
    pub path: String,
    /// Detection timestamp, formatted `%Y-%m-%d_%H-%M-%S`.
    pub created_time: String,
}

impl PendingRetry {
    pub fn new(path: impl Into<String>, created_time: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            created_time: created_time.into(),
        }
    }
}

/// Format a timestamp in the queue's `created_time` representation.
pub(crate) fn format_created_time(when: chrono::DateTime<chrono::Local>) -> String {
    when.format(CREATED_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pending_retry_serialization() {
        let item = PendingRetry::new("/archive/2024/05/01/invoice.pdf", "2024-05-01_09-30-15");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("/archive/2024/05/01/invoice.pdf"));
        assert!(json.contains("2024-05-01_09-30-15"));
    }

    #[test]
    fn test_pending_retry_deserialization() {
        let json = r#"{"path":"/archive/2024/05/01/invoice.pdf","created_time":"2024-05-01_09-30-15"}"#;
        let item: PendingRetry = serde_json::from_str(json).unwrap();
        assert_eq!(item.path, "/archive/2024/05/01/invoice.pdf");
        assert_eq!(item.created_time, "2024-05-01_09-30-15");
    }

    #[test]
    fn test_created_time_format() {
        let when = chrono::Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap();
        assert_eq!(format_created_time(when), "2024-05-01_09-30-15");
    }
}
