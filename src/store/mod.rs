//! Append-only snapshot storage.

pub mod file;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::Snapshot;

pub use file::FileStore;

/// Append-only store of check snapshots.
///
/// Snapshots are never mutated or deleted once written; queries are by
/// recency, by time window, or by the alert flag.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Append a snapshot and return its identifier.
    async fn append(&self, snapshot: &Snapshot) -> Result<String, StoreError>;

    /// The most recent snapshot, if any exist.
    async fn latest(&self) -> Result<Option<Snapshot>, StoreError>;

    /// All snapshots with `timestamp >= since`, in chronological order.
    async fn window(&self, since: DateTime<Utc>) -> Result<Vec<Snapshot>, StoreError>;

    /// Snapshots where an alert was sent, most recent first, capped at `limit`.
    async fn alerts(&self, limit: usize) -> Result<Vec<Snapshot>, StoreError>;
}
