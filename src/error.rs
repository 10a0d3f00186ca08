//! Error types for the monitoring service.

use thiserror::Error;

/// Errors from the upstream status fetch, fatal to the current check cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-retryable client error
    #[error("upstream rejected request: {status} - {body}")]
    ClientError { status: u16, body: String },

    /// All retry attempts were consumed
    #[error("upstream request failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Credential refresh failed
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Errors from the snapshot store, fatal to the operation that hit them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from an alert channel.
///
/// Send failures are recovered locally by the engine (the alert flag is
/// downgraded); they never fail a check cycle.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel not configured: {0}")]
    NotConfigured(String),

    #[error("mail API rejected message: {status} - {body}")]
    Rejected { status: u16, body: String },
}

/// Top-level error for a check cycle or summary query.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
