//! Upstream catalog status client.
//!
//! Wraps the aggregate product status endpoint with bounded retry logic:
//! exponential backoff on rate limits, server errors and timeouts, a single
//! credential refresh on auth failures, and immediate failure on any other
//! client error.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::auth::TokenProvider;
use crate::error::FetchError;
use crate::models::{Issue, StatusCounts};

/// Page size requested from the upstream API.
const PAGE_SIZE: u32 = 250;

/// Raw aggregate status report as returned by the upstream API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStatusReport {
    #[serde(default)]
    pub items: Vec<RawStatusItem>,
}

/// One item of the raw report: a status bucket with its count and, for
/// negative statuses, the issue breakdown.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStatusItem {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default, rename = "issueDetails")]
    pub issue_details: Vec<RawIssueDetail>,
}

/// One issue-detail entry nested under a report item.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssueDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub count: u64,
}

/// Retry policy for upstream requests.
///
/// Backoff doubles per consumed attempt from the per-class base delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts before the fetch fails.
    pub max_attempts: u32,
    /// Base delay after a rate-limit response.
    pub rate_limit_base: Duration,
    /// Base delay after a server error.
    pub server_error_base: Duration,
    /// Base delay after a request timeout.
    pub timeout_base: Duration,
    /// Per-request timeout; elapsing it counts as a timeout attempt.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_secs(60),
            server_error_base: Duration::from_secs(10),
            timeout_base: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn backoff(base: Duration, attempt: u32) -> Duration {
        base.saturating_mul(2_u32.checked_pow(attempt).unwrap_or(u32::MAX))
    }
}

/// Classification of one request attempt, driving the retry loop.
enum Attempt {
    Succeeded(RawStatusReport),
    BackOff(Duration),
    RefreshAuth,
}

/// Client for the upstream catalog status API.
pub struct StatusClient {
    client: reqwest::Client,
    base_url: String,
    account_id: String,
    tokens: Arc<dyn TokenProvider>,
    policy: RetryPolicy,
}

impl StatusClient {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        policy: RetryPolicy,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(policy.request_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            account_id: account_id.into(),
            tokens,
            policy,
        }
    }

    /// Fetch and parse status counts and top issues for one check cycle.
    ///
    /// One logical request; physically retried per the policy.
    pub async fn fetch_counts(
        &self,
        country: &str,
        reporting_context: &str,
        issue_limit: usize,
    ) -> Result<(StatusCounts, Vec<Issue>), FetchError> {
        let report = self.fetch_report(country, reporting_context).await?;
        let counts = parse_status_counts(&report);
        let issues = top_issue_codes(&report, issue_limit);
        Ok((counts, issues))
    }

    /// Fetch the raw aggregate status report.
    pub async fn fetch_report(
        &self,
        country: &str,
        reporting_context: &str,
    ) -> Result<RawStatusReport, FetchError> {
        let url = format!(
            "{}/issueresolution/v1/accounts/{}/aggregateProductStatuses",
            self.base_url, self.account_id
        );
        let filter =
            format!("reporting_context=\"{reporting_context}\" AND country=\"{country}\"");

        info!(country, reporting_context, "Fetching aggregate product statuses");

        let mut auth_refreshed = false;
        let mut attempt: u32 = 0;

        while attempt < self.policy.max_attempts {
            match self.try_request(&url, &filter, attempt).await? {
                Attempt::Succeeded(report) => {
                    info!(items = report.items.len(), "Fetched status report");
                    return Ok(report);
                }
                Attempt::BackOff(delay) => {
                    attempt += 1;
                    // No point sleeping once the attempt budget is spent.
                    if attempt >= self.policy.max_attempts {
                        break;
                    }
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        "Upstream request failed, backing off"
                    );
                    sleep(delay).await;
                }
                Attempt::RefreshAuth => {
                    if auth_refreshed {
                        return Err(FetchError::Auth(
                            "auth failure persisted after token refresh".to_string(),
                        ));
                    }
                    warn!("Authentication error, refreshing token");
                    self.tokens.refresh().await?;
                    auth_refreshed = true;
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            attempts: self.policy.max_attempts,
        })
    }

    /// One physical request attempt, classified for the retry loop.
    async fn try_request(
        &self,
        url: &str,
        filter: &str,
        attempt: u32,
    ) -> Result<Attempt, FetchError> {
        let token = self.tokens.token().await?;
        let page_size = PAGE_SIZE.to_string();

        let response = match self
            .client
            .get(url)
            .bearer_auth(&token)
            .query(&[("filter", filter), ("pageSize", page_size.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                debug!(attempt, "Request timed out");
                return Ok(Attempt::BackOff(RetryPolicy::backoff(
                    self.policy.timeout_base,
                    attempt,
                )));
            }
            Err(e) => return Err(FetchError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            let report = response.json::<RawStatusReport>().await?;
            return Ok(Attempt::Succeeded(report));
        }

        if status.as_u16() == 429 {
            return Ok(Attempt::BackOff(RetryPolicy::backoff(
                self.policy.rate_limit_base,
                attempt,
            )));
        }
        if status.is_server_error() {
            return Ok(Attempt::BackOff(RetryPolicy::backoff(
                self.policy.server_error_base,
                attempt,
            )));
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Ok(Attempt::RefreshAuth);
        }

        // Any other 4xx fails immediately without consuming a backoff delay.
        let body = response.text().await.unwrap_or_default();
        Err(FetchError::ClientError {
            status: status.as_u16(),
            body,
        })
    }
}

/// Accumulate report items into status counts.
///
/// Unrecognized status names are ignored, not treated as errors.
#[must_use]
pub fn parse_status_counts(report: &RawStatusReport) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for item in &report.items {
        match item.status.to_ascii_uppercase().as_str() {
            "APPROVED" => counts.approved += item.count,
            "PENDING" => counts.pending += item.count,
            "DISAPPROVED" => counts.disapproved += item.count,
            "LIMITED" => counts.limited += item.count,
            "SUSPENDED" => counts.suspended += item.count,
            "UNDER_REVIEW" => counts.under_review += item.count,
            "PROCESSING" => counts.processing += item.count,
            _ => {}
        }
    }
    counts
}

/// Extract the most frequent issue codes from negative-status items.
///
/// Issues are not merged across items sharing a code; ties keep input order
/// (stable sort) and the list is truncated to `limit`.
#[must_use]
pub fn top_issue_codes(report: &RawStatusReport, limit: usize) -> Vec<Issue> {
    let mut issues: Vec<Issue> = Vec::new();

    for item in &report.items {
        let negative = matches!(
            item.status.to_ascii_uppercase().as_str(),
            "DISAPPROVED" | "LIMITED" | "SUSPENDED"
        );
        if !negative {
            continue;
        }
        for detail in &item.issue_details {
            if !detail.code.is_empty() && detail.count > 0 {
                issues.push(Issue {
                    code: detail.code.clone(),
                    description: detail.description.clone(),
                    count: detail.count,
                });
            }
        }
    }

    issues.sort_by(|a, b| b.count.cmp(&a.count));
    issues.truncate(limit);
    issues
}
