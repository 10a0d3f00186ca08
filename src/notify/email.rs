//! Email alert channel over a transactional mail API.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ChannelError;
use crate::notify::{AlertChannel, AlertMessage};

/// Email channel backed by a SendGrid-style HTTP mail API.
pub struct EmailChannel {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    to: String,
}

/// Mail API request payload.
#[derive(Debug, Serialize)]
struct MailRequest {
    personalizations: Vec<Personalization>,
    from: Address,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<Address>,
}

#[derive(Debug, Serialize)]
struct Address {
    email: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

impl EmailChannel {
    #[must_use]
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            from: from.into(),
            to: to.into(),
        }
    }

    fn subject(alert: &AlertMessage) -> String {
        format!(
            "Merchant Center Alert - {} ({})",
            alert.country, alert.reporting_context
        )
    }

    /// Render the HTML alert body: totals table, delta, and top issues.
    fn body(alert: &AlertMessage) -> String {
        let totals = &alert.totals;
        let mut html = String::new();
        let _ = write!(
            html,
            "<h2>Product status alert for {} ({})</h2>\
             <p>Problematic products: <strong>{}</strong> \
             (disapproved {}, suspended {}, limited {})</p>\
             <p>Change in disapproved since last check: <strong>{}</strong></p>\
             <table border=\"1\" cellpadding=\"4\">\
             <tr><th>Status</th><th>Count</th></tr>\
             <tr><td>Approved</td><td>{}</td></tr>\
             <tr><td>Pending</td><td>{}</td></tr>\
             <tr><td>Disapproved</td><td>{}</td></tr>\
             <tr><td>Limited</td><td>{}</td></tr>\
             <tr><td>Suspended</td><td>{}</td></tr>\
             <tr><td>Under review</td><td>{}</td></tr>\
             <tr><td>Processing</td><td>{}</td></tr>\
             </table>",
            alert.country,
            alert.reporting_context,
            totals.problematic(),
            totals.disapproved,
            totals.suspended,
            totals.limited,
            alert.delta_disapproved,
            totals.approved,
            totals.pending,
            totals.disapproved,
            totals.limited,
            totals.suspended,
            totals.under_review,
            totals.processing,
        );

        if !alert.top_issues.is_empty() {
            html.push_str("<h3>Top issues</h3><ul>");
            for issue in &alert.top_issues {
                let _ = write!(
                    html,
                    "<li><strong>{}</strong> ({}): {}</li>",
                    issue.code, issue.count, issue.description
                );
            }
            html.push_str("</ul>");
        }

        html
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn enabled(&self) -> bool {
        self.api_key.is_some() && !self.to.is_empty()
    }

    async fn send(&self, alert: &AlertMessage) -> Result<(), ChannelError> {
        let Some(api_key) = &self.api_key else {
            return Err(ChannelError::NotConfigured(
                "MAIL_API_KEY not set".to_string(),
            ));
        };

        let payload = MailRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: self.to.clone(),
                }],
            }],
            from: Address {
                email: self.from.clone(),
            },
            subject: Self::subject(alert),
            content: vec![Content {
                content_type: "text/html",
                value: Self::body(alert),
            }],
        };

        debug!(to = %self.to, "Sending alert email");

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.api_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if matches!(status.as_u16(), 200 | 201 | 202) {
            info!(to = %self.to, "Alert email sent");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ChannelError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
