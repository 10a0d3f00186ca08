//! End-to-end check cycle tests against mocked upstream and mail APIs.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use merchant_watch::auth::StaticTokenProvider;
use merchant_watch::client::{RetryPolicy, StatusClient};
use merchant_watch::engine::CheckEngine;
use merchant_watch::models::AlertThresholds;
use merchant_watch::notify::EmailChannel;
use merchant_watch::store::{FileStore, SnapshotStore};
use merchant_watch::{EngineError, FetchError};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        rate_limit_base: Duration::from_millis(10),
        server_error_base: Duration::from_millis(10),
        timeout_base: Duration::from_millis(10),
        ..RetryPolicy::default()
    }
}

fn thresholds(absolute: i64, delta: i64) -> AlertThresholds {
    AlertThresholds {
        absolute_threshold: absolute,
        delta_threshold: delta,
        country: "PL".to_string(),
        reporting_context: "SHOPPING_ADS".to_string(),
    }
}

struct Harness {
    upstream: MockServer,
    mail: MockServer,
    engine: CheckEngine,
    store: Arc<FileStore>,
    _dir: tempfile::TempDir,
}

async fn harness(absolute: i64, delta: i64) -> Harness {
    let upstream = MockServer::start().await;
    let mail = MockServer::start().await;

    let client = StatusClient::new(
        upstream.uri(),
        "123456",
        Arc::new(StaticTokenProvider::new("test-token")),
        fast_policy(),
    );

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("snapshots.jsonl")).unwrap());

    let channel = Arc::new(EmailChannel::new(
        mail.uri(),
        Some("mail-key".to_string()),
        "alerts@example.com",
        "oncall@example.com",
    ));

    let engine = CheckEngine::new(
        client,
        Arc::clone(&store) as Arc<dyn SnapshotStore>,
        channel,
        thresholds(absolute, delta),
        5,
    );

    Harness {
        upstream,
        mail,
        engine,
        store,
        _dir: dir,
    }
}

fn report_with_disapproved(disapproved: u64) -> serde_json::Value {
    json!({
        "items": [
            {"status": "APPROVED", "count": 1000},
            {"status": "DISAPPROVED", "count": disapproved, "issueDetails": [
                {"code": "MISSING_GTIN", "description": "GTIN missing", "count": 15},
                {"code": "IMAGE_LINK_BROKEN", "description": "Broken image", "count": 10}
            ]}
        ]
    })
}

#[tokio::test]
async fn alert_fires_and_mail_sent_exactly_once() {
    let h = harness(50, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/v1/accounts/.*/aggregateProductStatuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(60)))
        .mount(&h.upstream)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&h.mail)
        .await;

    let result = h.engine.run_check().await.unwrap();
    assert!(result.alert_sent);
    assert_eq!(result.totals.disapproved, 60);
    assert_eq!(result.top_issues[0].code, "MISSING_GTIN");

    let persisted = h.store.latest().await.unwrap().unwrap();
    assert!(persisted.alert_sent);
    assert_eq!(persisted.totals.disapproved, 60);
}

#[tokio::test]
async fn failed_mail_send_downgrades_alert_flag() {
    let h = harness(50, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(60)))
        .mount(&h.upstream)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.mail)
        .await;

    let result = h.engine.run_check().await.unwrap();
    assert!(!result.alert_sent);

    // The run still persisted a snapshot, with the downgraded flag.
    let persisted = h.store.latest().await.unwrap().unwrap();
    assert!(!persisted.alert_sent);
}

#[tokio::test]
async fn no_alert_below_thresholds() {
    let h = harness(100, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(5)))
        .mount(&h.upstream)
        .await;

    // No mail mock mounted: any send would 404 and downgrade the flag, so a
    // true alert_sent=false here proves the channel was never invoked.
    let result = h.engine.run_check().await.unwrap();
    assert!(!result.alert_sent);
    assert_eq!(h.mail.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn first_run_has_zero_delta_second_run_diffs() {
    let h = harness(10_000, 10_000).await;

    let mock = Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(20)))
        .mount_as_scoped(&h.upstream)
        .await;

    let first = h.engine.run_check().await.unwrap();
    assert_eq!(first.delta.disapproved, 0);
    drop(mock);

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(35)))
        .mount(&h.upstream)
        .await;

    let second = h.engine.run_check().await.unwrap();
    assert_eq!(second.delta.disapproved, 15);

    let persisted = h.store.latest().await.unwrap().unwrap();
    assert_eq!(persisted.delta_disapproved, 15);
}

#[tokio::test]
async fn delta_alone_triggers_alert() {
    let h = harness(10_000, 10).await;

    let mock = Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(5)))
        .mount_as_scoped(&h.upstream)
        .await;
    h.engine.run_check().await.unwrap();
    drop(mock);

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(16)))
        .mount(&h.upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&h.mail)
        .await;

    let result = h.engine.run_check().await.unwrap();
    assert_eq!(result.delta.disapproved, 11);
    assert!(result.alert_sent);
}

#[tokio::test]
async fn fetch_failure_is_fatal_and_persists_nothing() {
    let h = harness(50, 10).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such account"))
        .mount(&h.upstream)
        .await;

    let err = h.engine.run_check().await.unwrap_err();
    assert!(matches!(err, EngineError::Fetch(_)));
    assert!(h.store.latest().await.unwrap().is_none());
}

#[tokio::test]
async fn server_error_retries_then_succeeds() {
    let h = harness(10_000, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&h.upstream)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(7)))
        .mount(&h.upstream)
        .await;

    let result = h.engine.run_check().await.unwrap();
    assert_eq!(result.totals.disapproved, 7);
    assert_eq!(h.upstream.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn retries_exhausted_fails_the_cycle() {
    let h = harness(10_000, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.upstream)
        .await;

    let err = h.engine.run_check().await.unwrap_err();
    assert!(matches!(err, EngineError::Fetch(_)));
    // max_attempts bounds the physical request count.
    assert_eq!(h.upstream.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn request_timeout_retries_then_succeeds() {
    let upstream = MockServer::start().await;

    // First response stalls past the request timeout, second is prompt.
    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(report_with_disapproved(4))
                .set_delay(Duration::from_secs(5)),
        )
        .up_to_n_times(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(4)))
        .mount(&upstream)
        .await;

    let client = StatusClient::new(
        upstream.uri(),
        "123456",
        Arc::new(StaticTokenProvider::new("test-token")),
        RetryPolicy {
            max_attempts: 3,
            timeout_base: Duration::from_millis(10),
            request_timeout: Duration::from_millis(250),
            ..RetryPolicy::default()
        },
    );

    let (counts, _issues) = client.fetch_counts("PL", "SHOPPING_ADS", 5).await.unwrap();
    assert_eq!(counts.disapproved, 4);
    assert_eq!(upstream.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn exhausted_retries_return_without_a_final_backoff_sleep() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;

    // With a one-minute base, any post-final-attempt sleep would trip the
    // outer timeout.
    let client = StatusClient::new(
        upstream.uri(),
        "123456",
        Arc::new(StaticTokenProvider::new("test-token")),
        RetryPolicy {
            max_attempts: 1,
            server_error_base: Duration::from_secs(60),
            ..RetryPolicy::default()
        },
    );

    let err = tokio::time::timeout(
        Duration::from_secs(1),
        client.fetch_report("PL", "SHOPPING_ADS"),
    )
    .await
    .expect("fetch did not fail promptly after the last attempt")
    .unwrap_err();
    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 1 }));
}

#[tokio::test]
async fn rate_limit_backs_off_and_recovers() {
    let h = harness(10_000, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&h.upstream)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(3)))
        .mount(&h.upstream)
        .await;

    let result = h.engine.run_check().await.unwrap();
    assert_eq!(result.totals.disapproved, 3);
}

#[tokio::test]
async fn auth_failure_refreshes_once_then_fails_if_persistent() {
    let h = harness(10_000, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.upstream)
        .await;

    let err = h.engine.run_check().await.unwrap_err();
    assert!(matches!(err, EngineError::Fetch(_)));
    // One original attempt plus one post-refresh retry, no backoff loop.
    assert_eq!(h.upstream.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn auth_failure_recovers_after_refresh() {
    let h = harness(10_000, 10_000).await;

    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&h.upstream)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/issueresolution/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_with_disapproved(2)))
        .mount(&h.upstream)
        .await;

    let result = h.engine.run_check().await.unwrap();
    assert_eq!(result.totals.disapproved, 2);
}
