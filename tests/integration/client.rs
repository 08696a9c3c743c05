//! Full runs through `EventClient` against the mock server

use crate::integration::mock_server::MockServerFixture;
use bulk_events::{Error, ItemId, ItemStatus, Outcome};
use mockito::Matcher;
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_mixed_outcomes_keep_order_and_totals() {
    let fixture = MockServerFixture::new().await;
    let ok = fixture
        .mock_create_matching(json!({"kind": "ok"}), 201, r#"{"id":"evt"}"#, 3)
        .await;
    let bad = fixture
        .mock_create_matching(json!({"kind": "bad"}), 422, r#"{"detail":"invalid"}"#, 1)
        .await;

    let client = fixture.client_builder().batch_size(2).build().unwrap();
    let payloads = vec![
        json!({"kind": "ok", "n": 0}),
        json!({"kind": "bad", "n": 1}),
        json!({"kind": "ok", "n": 2}),
        json!({"kind": "ok", "n": 3}),
    ];
    let outcome = client.create_events(payloads).await.unwrap();

    ok.assert_async().await;
    bad.assert_async().await;
    assert_eq!(outcome.batches, 2);
    assert_eq!(outcome.metrics.total_items, 4);
    assert_eq!(outcome.metrics.successful, 3);
    assert_eq!(outcome.metrics.failed, 1);
    assert_eq!(
        outcome.metrics.total_items,
        outcome.metrics.successful + outcome.metrics.failed
    );

    let ids: Vec<_> = outcome.reports.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, (0..4u64).map(ItemId::Int).collect::<Vec<_>>());
    assert_eq!(outcome.reports[1].status, ItemStatus::Failed);
    assert_eq!(outcome.reports[1].attempts, 1);
}

#[tokio::test]
async fn test_server_errors_are_retried_then_reported() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_create(500, r#"{"detail":"boom"}"#, 3).await;

    let client = fixture.client_builder().max_retries(2).build().unwrap();
    let outcome = client.create_events(vec![json!({"n": 0})]).await.unwrap();

    mock.assert_async().await;
    let report = &outcome.reports[0];
    assert_eq!(report.status, ItemStatus::Failed);
    assert_eq!(report.attempts, 3);
    assert!(matches!(
        report.outcome,
        Some(Outcome::ServerError { status: 500, .. })
    ));
    assert_eq!(outcome.metrics.server_errors, 3);
    assert_eq!(outcome.metrics.retries, 2);
}

#[tokio::test]
async fn test_rate_limit_waits_for_retry_after() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_rate_limited(Some("0.05"), 3).await;

    let client = fixture.client_builder().max_retries(2).build().unwrap();
    let started = Instant::now();
    let outcome = client.create_events(vec![json!({"n": 0})]).await.unwrap();

    mock.assert_async().await;
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(outcome.metrics.rate_limited, 3);
    assert_eq!(outcome.metrics.retries, 2);
    assert_eq!(outcome.metrics.failed, 1);
}

#[tokio::test]
async fn test_list_events_passes_days_ahead() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_get(
            "/events",
            Matcher::UrlEncoded("days_ahead".into(), "3".into()),
            200,
            r#"[{"id":"evt_1"},{"id":"evt_2"}]"#,
            1,
        )
        .await;

    let client = fixture.client_builder().build().unwrap();
    let events = client.list_events(3).await.unwrap();

    mock.assert_async().await;
    assert_eq!(events.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_status() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_get("/status", Matcher::Any, 200, r#"{"authenticated":true}"#, 1)
        .await;

    let client = fixture.client_builder().build().unwrap();
    let status = client.status().await.unwrap();
    assert_eq!(status["authenticated"], true);
}

#[tokio::test]
async fn test_status_failure_is_remote_error() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_get("/status", Matcher::Any, 503, r#"{"detail":"down"}"#, 3)
        .await;

    let client = fixture.client_builder().max_retries(2).build().unwrap();
    match client.status().await {
        Err(Error::Remote { status, message }) => {
            assert_eq!(status, 503);
            assert!(message.contains("3 attempt(s)"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_status_recovers_after_server_error() {
    let fixture = MockServerFixture::new().await;
    let unavailable = fixture
        .mock_get("/status", Matcher::Any, 503, r#"{"detail":"down"}"#, 1)
        .await;
    let ok = fixture
        .mock_get("/status", Matcher::Any, 200, r#"{"authenticated":true}"#, 1)
        .await;

    let client = fixture.client_builder().build().unwrap();
    let status = client.status().await.unwrap();

    unavailable.assert_async().await;
    ok.assert_async().await;
    assert_eq!(status["authenticated"], true);
}

#[tokio::test]
async fn test_list_events_waits_out_rate_limit() {
    let fixture = MockServerFixture::new().await;
    let limited = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/events")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "0.2")
            .expect(1)
            .create_async()
            .await
    };
    let ok = fixture
        .mock_get("/events", Matcher::Any, 200, r#"[]"#, 1)
        .await;

    let client = fixture.client_builder().build().unwrap();
    let started = Instant::now();
    let events = client.list_events(7).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(200));
    limited.assert_async().await;
    ok.assert_async().await;
    assert_eq!(events, json!([]));
}

#[tokio::test]
async fn test_client_error_read_is_not_retried() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_get("/status", Matcher::Any, 401, r#"{"detail":"unauthorized"}"#, 1)
        .await;

    let client = fixture.client_builder().build().unwrap();
    assert!(matches!(
        client.status().await,
        Err(Error::Remote { status: 401, .. })
    ));
    mock.assert_async().await;
}
