//! Alert notification channels.

pub mod email;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::models::{Issue, StatusCounts};

pub use email::EmailChannel;

/// Payload of one threshold alert.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub country: String,
    pub reporting_context: String,
    pub totals: StatusCounts,
    pub delta_disapproved: i64,
    pub top_issues: Vec<Issue>,
}

/// Trait for alert channels (email, chat webhooks, etc.).
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver an alert through this channel.
    async fn send(&self, alert: &AlertMessage) -> Result<(), ChannelError>;
}
