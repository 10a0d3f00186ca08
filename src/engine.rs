//! Check-and-Alert engine.
//!
//! Orchestrates one check cycle (fetch, parse, diff, decide, notify, persist)
//! and derives status/trend summaries from stored history. Collaborators are
//! injected at construction; there is no ambient global state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::client::StatusClient;
use crate::error::EngineError;
use crate::models::{
    AlertThresholds, CheckResult, DeltaReport, HistoryEntry, Snapshot, StatusCounts,
    StatusSummary, SummaryBody, Trend,
};
use crate::notify::{AlertChannel, AlertMessage};
use crate::store::SnapshotStore;

/// Hard cap on alert-history page size, regardless of the requested limit.
pub const HISTORY_LIMIT_CAP: usize = 50;

/// The core engine: one instance per process, collaborators injected.
pub struct CheckEngine {
    client: StatusClient,
    store: Arc<dyn SnapshotStore>,
    channel: Arc<dyn AlertChannel>,
    thresholds: AlertThresholds,
    top_issues_limit: usize,
    // Serializes the read-latest / compare / append sequence: manual and
    // scheduled triggers must not interleave within one cycle.
    run_lock: tokio::sync::Mutex<()>,
}

impl CheckEngine {
    #[must_use]
    pub fn new(
        client: StatusClient,
        store: Arc<dyn SnapshotStore>,
        channel: Arc<dyn AlertChannel>,
        thresholds: AlertThresholds,
        top_issues_limit: usize,
    ) -> Self {
        Self {
            client,
            store,
            channel,
            thresholds,
            top_issues_limit,
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Decide whether current totals or the disapproved delta warrant an alert.
    ///
    /// Fires when the problematic total strictly exceeds the absolute
    /// threshold, or the delta reaches the delta threshold (inclusive). A
    /// negative delta never triggers the delta branch.
    #[must_use]
    pub fn should_alert(&self, totals: &StatusCounts, delta_disapproved: i64) -> bool {
        #[allow(clippy::cast_possible_wrap)]
        let problematic = totals.problematic() as i64;

        if problematic > self.thresholds.absolute_threshold {
            warn!(
                problematic,
                threshold = self.thresholds.absolute_threshold,
                "Absolute threshold exceeded"
            );
            return true;
        }

        if delta_disapproved >= self.thresholds.delta_threshold {
            warn!(
                delta = delta_disapproved,
                threshold = self.thresholds.delta_threshold,
                "Delta threshold exceeded"
            );
            return true;
        }

        false
    }

    /// Run one full check cycle.
    ///
    /// A fetch failure is fatal to the cycle and nothing is persisted. A
    /// notify failure downgrades the alert flag but the cycle completes.
    pub async fn run_check(&self) -> Result<CheckResult, EngineError> {
        let _guard = self.run_lock.lock().await;

        info!(
            country = %self.thresholds.country,
            reporting_context = %self.thresholds.reporting_context,
            "Starting product status check"
        );

        let (totals, top_issues) = self
            .client
            .fetch_counts(
                &self.thresholds.country,
                &self.thresholds.reporting_context,
                self.top_issues_limit,
            )
            .await?;

        // No previous snapshot means delta 0, not "delta from zero".
        let previous = self.store.latest().await?;
        #[allow(clippy::cast_possible_wrap)]
        let delta_disapproved = previous
            .as_ref()
            .map_or(0, |p| totals.disapproved as i64 - p.totals.disapproved as i64);

        let mut alert_sent = self.should_alert(&totals, delta_disapproved);

        if alert_sent {
            warn!("Alert thresholds exceeded, sending notification");
            let message = AlertMessage {
                country: self.thresholds.country.clone(),
                reporting_context: self.thresholds.reporting_context.clone(),
                totals: totals.clone(),
                delta_disapproved,
                top_issues: top_issues.clone(),
            };
            if let Err(e) = self.channel.send(&message).await {
                // An alert that failed to send must never be recorded as sent.
                error!(channel = self.channel.name(), error = %e, "Failed to send alert");
                alert_sent = false;
            }
        }

        let snapshot = Snapshot {
            timestamp: Utc::now(),
            country: self.thresholds.country.clone(),
            reporting_context: self.thresholds.reporting_context.clone(),
            totals,
            delta_disapproved,
            alert_sent,
            top_issues,
        };

        let id = self.store.append(&snapshot).await?;
        info!(snapshot_id = %id, alert_sent, "Check completed");

        Ok(CheckResult {
            checked_at: snapshot.timestamp,
            country: snapshot.country,
            reporting_context: snapshot.reporting_context,
            totals: snapshot.totals,
            delta: DeltaReport {
                disapproved: delta_disapproved,
            },
            alert_sent,
            top_issues: snapshot.top_issues,
        })
    }

    /// Current status summary: latest snapshot plus trailing 24-hour trend.
    pub async fn status_summary(&self) -> Result<StatusSummary, EngineError> {
        let Some(latest) = self.store.latest().await? else {
            return Ok(StatusSummary::NoData {
                message: "No previous checks found".to_string(),
            });
        };

        let window = self.store.window(Utc::now() - Duration::hours(24)).await?;
        let trend = Trend::from_window(&window);

        let body = SummaryBody {
            last_check: latest.timestamp,
            country: latest.country,
            reporting_context: latest.reporting_context,
            totals: latest.totals,
            delta: DeltaReport {
                disapproved: latest.delta_disapproved,
            },
            alert_sent: latest.alert_sent,
            trend_24h: trend,
            checks_24h: window.len(),
        };

        Ok(if latest.alert_sent {
            StatusSummary::Alert(body)
        } else {
            StatusSummary::Healthy(body)
        })
    }

    /// Alert history, most recent first, capped at 50 entries.
    pub async fn alert_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, EngineError> {
        let limit = limit.min(HISTORY_LIMIT_CAP);
        let snapshots = self.store.alerts(limit).await?;
        Ok(snapshots.into_iter().map(HistoryEntry::from).collect())
    }

    /// Snapshots from the trailing 24-hour window, chronological. Used by the
    /// dashboard chart.
    pub async fn window_24h(&self) -> Result<Vec<Snapshot>, EngineError> {
        Ok(self.store.window(Utc::now() - Duration::hours(24)).await?)
    }

    /// The thresholds this engine runs with.
    #[must_use]
    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }
}
