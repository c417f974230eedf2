use crate::core::category::Category;
use crate::core::duplicate::CandidateReport;
use crate::core::geo::Coordinate;
use crate::core::severity::Severity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Error)]
pub enum StoreReadError {
    #[error("Failed to read report store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Report store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreWriteError {
    #[error("Failed to write report store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Duplicate,
}

/// A triaged report as it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    pub image_ref: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub status: ReportStatus,
    pub is_duplicate: bool,
    #[serde(default)]
    pub duplicate_of: Option<String>,
    pub category: Category,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl StoredReport {
    pub fn as_candidate(&self) -> CandidateReport {
        CandidateReport {
            id: self.id.clone(),
            location: self.location,
            fingerprint: self.fingerprint.clone(),
        }
    }
}

/// Bulk read of every stored report the duplicate check should scan.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateReport>, StoreReadError>;
}

/// Persistence for triaged reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn append(&self, report: &StoredReport) -> Result<(), StoreWriteError>;

    /// All stored reports, newest first.
    async fn list_reports(&self) -> Result<Vec<StoredReport>, StoreReadError>;
}

/// Append-only JSON-lines file, one report per line.
pub struct JsonlReportStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File contents, or an empty string when nothing was stored yet.
    async fn read_contents(&self) -> Result<String, StoreReadError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(StoreReadError::Io {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    fn parse_lines<T: serde::de::DeserializeOwned>(&self, contents: &str) -> Vec<T> {
        let mut records = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(record) => records.push(record),
                Err(err) => log::warn!(
                    "Skipping malformed entry {} in {}: {}",
                    i,
                    self.path.display(),
                    err
                ),
            }
        }
        records
    }
}

#[async_trait]
impl CandidateStore for JsonlReportStore {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateReport>, StoreReadError> {
        let contents = self.read_contents().await?;
        let candidates: Vec<CandidateReport> = self.parse_lines(&contents);
        log::debug!(
            "Loaded {} candidates from {}",
            candidates.len(),
            self.path.display()
        );
        Ok(candidates)
    }
}

#[async_trait]
impl ReportSink for JsonlReportStore {
    async fn append(&self, report: &StoredReport) -> Result<(), StoreWriteError> {
        let line = serde_json::to_string(report)?;
        let io_err = |source: std::io::Error| StoreWriteError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(())
    }

    async fn list_reports(&self) -> Result<Vec<StoredReport>, StoreReadError> {
        let contents = self.read_contents().await?;
        let mut reports: Vec<StoredReport> = self.parse_lines(&contents);
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }
}

/// Reports held in memory, in insertion order.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<StoredReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(reports: Vec<StoredReport>) -> Self {
        Self {
            reports: RwLock::new(reports),
        }
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[async_trait]
impl CandidateStore for MemoryReportStore {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateReport>, StoreReadError> {
        let reports = self.reports.read().await;
        Ok(reports.iter().map(StoredReport::as_candidate).collect())
    }
}

#[async_trait]
impl ReportSink for MemoryReportStore {
    async fn append(&self, report: &StoredReport) -> Result<(), StoreWriteError> {
        self.reports.write().await.push(report.clone());
        Ok(())
    }

    async fn list_reports(&self) -> Result<Vec<StoredReport>, StoreReadError> {
        let mut reports = self.reports.read().await.clone();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn report(id: &str, hour: u32) -> StoredReport {
        StoredReport {
            id: id.to_string(),
            image_ref: format!("/uploads/{}.jpg", id),
            description: String::new(),
            location: Some(Coordinate::new(12.9716, 77.5946)),
            user_name: String::new(),
            phone: String::new(),
            fingerprint: Some("00ff00ff00ff00ff".to_string()),
            status: ReportStatus::Pending,
            is_duplicate: false,
            duplicate_of: None,
            category: Category::Pothole,
            severity: Severity::Moderate,
            created_at: Utc.with_ymd_and_hms(2025, 1, 10, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlReportStore::new(temp_dir.path().join("reports.jsonl"));
        assert!(store.fetch_candidates().await.unwrap().is_empty());
        assert!(store.list_reports().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlReportStore::new(temp_dir.path().join("nested").join("reports.jsonl"));

        store.append(&report("a", 8)).await.unwrap();
        store.append(&report("b", 9)).await.unwrap();

        let candidates = store.fetch_candidates().await.unwrap();
        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(candidates[0].fingerprint.as_deref(), Some("00ff00ff00ff00ff"));

        let listed = store.list_reports().await.unwrap();
        assert_eq!(listed[0].id, "b");
        assert_eq!(listed[1], report("a", 8));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports.jsonl");
        let good = serde_json::to_string(&report("ok", 7)).unwrap();
        fs::write(&path, format!("{{not json\n\n{}\n", good)).unwrap();

        let store = JsonlReportStore::new(&path);
        let candidates = store.fetch_candidates().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "ok");
    }

    #[tokio::test]
    async fn test_candidates_from_foreign_records() {
        // Records written by other producers only need an id
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"id":"x1","location":{"_latitude":1.0,"_longitude":2.0},"imageHash":"00000000000000ff"}"#,
                "\n",
                r#"{"id":"x2"}"#,
                "\n"
            ),
        )
        .unwrap();

        let store = JsonlReportStore::new(&path);
        let candidates = store.fetch_candidates().await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].location, Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(candidates[0].fingerprint.as_deref(), Some("00000000000000ff"));
        assert_eq!(candidates[1].location, None);
    }

    #[tokio::test]
    async fn test_unreadable_store_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be read as a file
        let store = JsonlReportStore::new(temp_dir.path());
        let result = store.fetch_candidates().await;
        assert!(matches!(result, Err(StoreReadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryReportStore::new();
        assert!(store.is_empty().await);
        store.append(&report("a", 1)).await.unwrap();
        store.append(&report("b", 3)).await.unwrap();
        assert_eq!(store.len().await, 2);

        let candidates = store.fetch_candidates().await.unwrap();
        assert_eq!(candidates[0].id, "a");
        let listed = store.list_reports().await.unwrap();
        assert_eq!(listed[0].id, "b");
    }

    #[tokio::test]
    async fn test_memory_store_seeded() {
        let store = MemoryReportStore::with_reports(vec![report("old", 2), report("new", 5)]);
        let listed = store.list_reports().await.unwrap();
        assert_eq!(listed[0].id, "new");
        assert_eq!(store.fetch_candidates().await.unwrap()[0].id, "old");
    }

    #[test]
    fn test_stored_report_wire_names() {
        let json = serde_json::to_value(report("a", 1)).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["category"], "pothole");
        assert_eq!(json["severity"], "moderate");
    }
}
