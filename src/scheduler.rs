//! Fixed-interval check driver.
//!
//! Runs one check cycle, waits for the interval, repeats. A failing cycle is
//! logged and the loop waits for the next tick rather than terminating.
//! Shutdown is an explicit watch-channel token honored only at cycle
//! boundaries; an in-flight cycle always runs to completion so no partial
//! snapshot is written.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use crate::engine::CheckEngine;

/// Handle used to request scheduler shutdown.
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Signal the scheduler to stop after the current cycle.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Periodic check scheduler.
pub struct Scheduler {
    engine: Arc<CheckEngine>,
    interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl Scheduler {
    /// Create a scheduler and its shutdown handle.
    #[must_use]
    pub fn new(engine: Arc<CheckEngine>, interval: Duration) -> (Self, ShutdownHandle) {
        let (tx, shutdown_rx) = watch::channel(false);
        (
            Self {
                engine,
                interval,
                shutdown_rx,
            },
            ShutdownHandle { tx },
        )
    }

    /// Run the scheduler loop until shutdown is requested.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );

        loop {
            self.run_cycle().await;

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Shutdown requested, stopping scheduler");
                        break;
                    }
                }
            }

            if *self.shutdown_rx.borrow() {
                info!("Shutdown requested, stopping scheduler");
                break;
            }
        }
    }

    /// One scheduled cycle; errors never escape the loop.
    async fn run_cycle(&self) {
        info!("Starting scheduled check cycle");
        match self.engine.run_check().await {
            Ok(result) => {
                info!(
                    alert_sent = result.alert_sent,
                    disapproved = result.totals.disapproved,
                    "Scheduled check completed"
                );
            }
            Err(e) => {
                error!(error = %e, "Scheduled check failed, waiting for next trigger");
            }
        }
    }
}
