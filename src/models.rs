//! Data model for merchant catalog status monitoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate product counts per status, as reported by the upstream catalog API.
///
/// All fields default to zero; counts are additive accumulations from raw
/// report items whose status matches the field name (case-insensitively).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(default)]
    pub approved: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub disapproved: u64,
    #[serde(default)]
    pub limited: u64,
    #[serde(default)]
    pub suspended: u64,
    #[serde(default)]
    pub under_review: u64,
    #[serde(default)]
    pub processing: u64,
}

impl StatusCounts {
    /// Total count of products in a negative status.
    #[must_use]
    pub const fn problematic(&self) -> u64 {
        self.disapproved + self.suspended + self.limited
    }
}

/// One distinct problem category found on items in a negative status.
///
/// Occurrences are not merged across report items sharing the same code;
/// each contributing entry stays a distinct issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub code: String,
    pub description: String,
    pub count: u64,
}

/// One persisted record of aggregate status counts at a point in time.
///
/// Constructed once per check cycle, immutable after creation, and persisted
/// append-only. The store owns its durable lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub country: String,
    pub reporting_context: String,
    pub totals: StatusCounts,
    pub delta_disapproved: i64,
    pub alert_sent: bool,
    #[serde(default)]
    pub top_issues: Vec<Issue>,
}

/// Alert threshold configuration, read-only input per check run.
#[derive(Debug, Clone)]
pub struct AlertThresholds {
    /// Problematic-total ceiling; strictly exceeding it fires an alert.
    pub absolute_threshold: i64,
    /// Disapproved-delta floor; reaching it (inclusive) fires an alert.
    pub delta_threshold: i64,
    pub country: String,
    pub reporting_context: String,
}

/// Result of a single check cycle, mirroring the persisted snapshot in a
/// shape suitable for external reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub checked_at: DateTime<Utc>,
    pub country: String,
    pub reporting_context: String,
    pub totals: StatusCounts,
    pub delta: DeltaReport,
    pub alert_sent: bool,
    #[serde(default)]
    pub top_issues: Vec<Issue>,
}

/// Delta section of a check result or status summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaReport {
    pub disapproved: i64,
}

/// Direction of the disapproved-count trend over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

/// Trend over the trailing 24-hour window.
///
/// Only the chronologically first and last snapshots in the window matter;
/// intermediate snapshots do not affect the result. This is intended
/// behavior, not an approximation that needs fixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub trend: TrendDirection,
    pub change: i64,
}

impl Trend {
    /// Compute the trend from a window of snapshots in chronological order.
    #[must_use]
    pub fn from_window(window: &[Snapshot]) -> Self {
        if window.len() < 2 {
            return Self {
                trend: TrendDirection::InsufficientData,
                change: 0,
            };
        }

        let first = &window[0];
        let last = &window[window.len() - 1];
        #[allow(clippy::cast_possible_wrap)]
        let change = last.totals.disapproved as i64 - first.totals.disapproved as i64;
        let trend = match change {
            c if c > 0 => TrendDirection::Increasing,
            c if c < 0 => TrendDirection::Decreasing,
            _ => TrendDirection::Stable,
        };
        Self { trend, change }
    }
}

/// Current status summary served by `GET /status`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusSummary {
    /// No checks have been recorded yet. Not an error.
    NoData { message: String },
    /// Latest snapshot plus trailing-window trend.
    Healthy(SummaryBody),
    /// Same shape as `Healthy`, but the latest snapshot carried an alert.
    Alert(SummaryBody),
}

/// Shared body of a non-empty status summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryBody {
    pub last_check: DateTime<Utc>,
    pub country: String,
    pub reporting_context: String,
    pub totals: StatusCounts,
    pub delta: DeltaReport,
    pub alert_sent: bool,
    pub trend_24h: Trend,
    pub checks_24h: usize,
}

/// One entry in the alert history, derived 1:1 from a snapshot where the
/// alert flag is set.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub country: String,
    pub reporting_context: String,
    pub totals: StatusCounts,
    pub delta_disapproved: i64,
    pub top_issues: Vec<Issue>,
}

impl From<Snapshot> for HistoryEntry {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            country: snapshot.country,
            reporting_context: snapshot.reporting_context,
            totals: snapshot.totals,
            delta_disapproved: snapshot.delta_disapproved,
            top_issues: snapshot.top_issues,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

impl HealthStatus {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "healthy",
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
