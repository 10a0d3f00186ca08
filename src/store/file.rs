//! JSONL-backed snapshot store.
//!
//! One JSON document per line, appended per check cycle. Reads scan the full
//! file; corrupt lines are skipped with a warning rather than failing the
//! query. Adequate for a check every 15-60 minutes.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::Snapshot;

use super::SnapshotStore;

/// Append-only snapshot log on the local filesystem.
pub struct FileStore {
    path: PathBuf,
    // Serializes appends; readers tolerate a concurrent append because
    // writes are whole-line and flushed.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at `path`, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Read every parseable snapshot in file order (which is append order).
    fn read_all(&self) -> Result<Vec<Snapshot>, StoreError> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let file = std::fs::File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut snapshots = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Snapshot>(&line) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "Skipping corrupt snapshot line");
                }
            }
        }

        Ok(snapshots)
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn append(&self, snapshot: &Snapshot) -> Result<String, StoreError> {
        let _guard = self.write_lock.lock().await;

        let line = serde_json::to_string(snapshot)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()?;

        let id = snapshot.timestamp.timestamp_millis().to_string();
        debug!(id = %id, "Appended snapshot");
        Ok(id)
    }

    async fn latest(&self) -> Result<Option<Snapshot>, StoreError> {
        let mut snapshots = self.read_all()?;
        snapshots.sort_by_key(|s| s.timestamp);
        Ok(snapshots.pop())
    }

    async fn window(&self, since: DateTime<Utc>) -> Result<Vec<Snapshot>, StoreError> {
        let mut snapshots: Vec<Snapshot> = self
            .read_all()?
            .into_iter()
            .filter(|s| s.timestamp >= since)
            .collect();
        snapshots.sort_by_key(|s| s.timestamp);
        Ok(snapshots)
    }

    async fn alerts(&self, limit: usize) -> Result<Vec<Snapshot>, StoreError> {
        let mut snapshots: Vec<Snapshot> = self
            .read_all()?
            .into_iter()
            .filter(|s| s.alert_sent)
            .collect();
        snapshots.sort_by_key(|s| std::cmp::Reverse(s.timestamp));
        snapshots.truncate(limit);
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusCounts;
    use chrono::Duration;

    fn snapshot_at(hours_ago: i64, disapproved: u64, alert_sent: bool) -> Snapshot {
        Snapshot {
            timestamp: Utc::now() - Duration::hours(hours_ago),
            country: "PL".to_string(),
            reporting_context: "SHOPPING_ADS".to_string(),
            totals: StatusCounts {
                disapproved,
                ..StatusCounts::default()
            },
            delta_disapproved: 0,
            alert_sent,
            top_issues: vec![],
        }
    }

    fn temp_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("snapshots.jsonl")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_latest_on_empty_store() {
        let (_dir, store) = temp_store();
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_then_latest() {
        let (_dir, store) = temp_store();
        store.append(&snapshot_at(2, 10, false)).await.unwrap();
        store.append(&snapshot_at(1, 20, false)).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.totals.disapproved, 20);
    }

    #[tokio::test]
    async fn test_window_is_chronological_and_inclusive() {
        let (_dir, store) = temp_store();
        let old = snapshot_at(48, 1, false);
        let boundary = snapshot_at(24, 2, false);
        let recent = snapshot_at(1, 3, false);
        store.append(&recent).await.unwrap();
        store.append(&old).await.unwrap();
        store.append(&boundary).await.unwrap();

        let window = store.window(boundary.timestamp).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].totals.disapproved, 2);
        assert_eq!(window[1].totals.disapproved, 3);
    }

    #[tokio::test]
    async fn test_alerts_most_recent_first_with_limit() {
        let (_dir, store) = temp_store();
        store.append(&snapshot_at(3, 10, true)).await.unwrap();
        store.append(&snapshot_at(2, 20, false)).await.unwrap();
        store.append(&snapshot_at(1, 30, true)).await.unwrap();
        store.append(&snapshot_at(4, 40, true)).await.unwrap();

        let alerts = store.alerts(2).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].totals.disapproved, 30);
        assert_eq!(alerts[1].totals.disapproved, 10);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");
        let store = FileStore::open(&path).unwrap();
        store.append(&snapshot_at(1, 5, false)).await.unwrap();

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        store.append(&snapshot_at(0, 6, false)).await.unwrap();
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.totals.disapproved, 6);

        let all = store.window(Utc::now() - Duration::hours(2)).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
