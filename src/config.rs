//! Configuration for the monitoring service.

use std::env;

use crate::models::AlertThresholds;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Base URL of the upstream catalog status API.
    pub merchant_base_url: String,
    /// Merchant account identifier used in upstream request paths.
    pub merchant_account_id: String,
    /// Static bearer token for the upstream API (tests and simple deploys).
    pub merchant_api_token: Option<String>,
    /// Problematic-total threshold (strictly exceeding it alerts).
    pub alert_threshold_abs: i64,
    /// Disapproved-delta threshold (reaching it alerts).
    pub alert_threshold_delta: i64,
    /// Country scope for the status query.
    pub alert_country: String,
    /// Upstream reporting context (e.g. advertising surface).
    pub alert_reporting_context: String,
    /// Minutes between scheduled checks.
    pub check_interval_minutes: u64,
    /// Maximum issues carried on a snapshot.
    pub top_issues_limit: usize,
    /// Maximum fetch attempts before the cycle fails.
    pub max_fetch_attempts: u32,
    /// Base URL of the transactional mail API.
    pub mail_api_url: String,
    /// API key for the mail API; unset disables email alerts.
    pub mail_api_key: Option<String>,
    /// Alert sender address.
    pub mail_from: String,
    /// Alert recipient address.
    pub mail_to: String,
    /// Path of the append-only snapshot log.
    pub snapshot_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            merchant_base_url: env::var("MERCHANT_BASE_URL")
                .unwrap_or_else(|_| "https://merchantapi.googleapis.com".to_string()),
            merchant_account_id: env::var("MERCHANT_ACCOUNT_ID").unwrap_or_default(),
            merchant_api_token: env::var("MERCHANT_API_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            alert_threshold_abs: env::var("ALERT_THRESHOLD_ABS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(25),
            alert_threshold_delta: env::var("ALERT_THRESHOLD_DELTA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            alert_country: env::var("ALERT_COUNTRY").unwrap_or_else(|_| "PL".to_string()),
            alert_reporting_context: env::var("ALERT_REPORTING_CONTEXT")
                .unwrap_or_else(|_| "SHOPPING_ADS".to_string()),
            check_interval_minutes: env::var("CHECK_INTERVAL_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            top_issues_limit: env::var("TOP_ISSUES_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            max_fetch_attempts: env::var("MAX_FETCH_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            mail_api_url: env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "https://api.sendgrid.com".to_string()),
            mail_api_key: env::var("MAIL_API_KEY").ok().filter(|s| !s.is_empty()),
            mail_from: env::var("MAIL_FROM").unwrap_or_default(),
            mail_to: env::var("MAIL_TO").unwrap_or_default(),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .unwrap_or_else(|_| "data/snapshots.jsonl".to_string()),
        }
    }
}

impl Config {
    /// Alert thresholds for one check run.
    #[must_use]
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            absolute_threshold: self.alert_threshold_abs,
            delta_threshold: self.alert_threshold_delta,
            country: self.alert_country.clone(),
            reporting_context: self.alert_reporting_context.clone(),
        }
    }
}
