//! Outcome classification for single attempts against the mock server

use crate::integration::mock_server::{MockServerFixture, TEST_TOKEN};
use bulk_events::transport::HttpTransport;
use bulk_events::types::{Outcome, WorkItem};
use bulk_events::{ClientConfig, HttpExecutor, RequestExecutor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn executor(config: &ClientConfig) -> HttpExecutor {
    let transport = Arc::new(HttpTransport::new(config).unwrap());
    HttpExecutor::new(transport, config.request_timeout())
}

fn item() -> WorkItem {
    WorkItem::new(7u64, json!({"title": "Standup", "duration_minutes": 30}))
}

#[tokio::test]
async fn test_created_event_is_success() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_create(201, r#"{"id":"evt_1","status":"confirmed"}"#, 1)
        .await;

    let record = executor(&fixture.config()).execute(&item(), 0).await.unwrap();

    mock.assert_async().await;
    assert_eq!(record.attempt(), 0);
    assert_eq!(record.item_id().to_string(), "7");
    match record.outcome() {
        Outcome::Success { payload, .. } => assert_eq!(payload["id"], "evt_1"),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited_reads_retry_after() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_rate_limited(Some("3"), 1).await;

    let record = executor(&fixture.config()).execute(&item(), 0).await.unwrap();
    assert_eq!(
        record.outcome(),
        &Outcome::RateLimited {
            retry_after: Duration::from_secs(3)
        }
    );
}

#[tokio::test]
async fn test_rate_limited_without_hint_waits_one_second() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_rate_limited(None, 1).await;

    let record = executor(&fixture.config()).execute(&item(), 0).await.unwrap();
    assert_eq!(
        record.outcome(),
        &Outcome::RateLimited {
            retry_after: Duration::from_secs(1)
        }
    );
}

#[tokio::test]
async fn test_garbage_retry_after_waits_one_second() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_rate_limited(Some("soon"), 1).await;

    let record = executor(&fixture.config()).execute(&item(), 0).await.unwrap();
    assert_eq!(
        record.outcome(),
        &Outcome::RateLimited {
            retry_after: Duration::from_secs(1)
        }
    );
}

#[tokio::test]
async fn test_server_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_create(503, r#"{"detail":"unavailable"}"#, 1).await;

    let record = executor(&fixture.config()).execute(&item(), 2).await.unwrap();
    assert!(matches!(
        record.outcome(),
        Outcome::ServerError { status: 503, .. }
    ));
    assert!(record.outcome().is_retryable());
}

#[tokio::test]
async fn test_client_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_create(400, r#"{"detail":"bad payload"}"#, 1).await;

    let record = executor(&fixture.config()).execute(&item(), 0).await.unwrap();
    assert_eq!(record.outcome(), &Outcome::ClientError { status: 400 });
    assert!(!record.outcome().is_retryable());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let config = ClientConfig::new()
        .with_base_url("http://127.0.0.1:1")
        .with_api_token(TEST_TOKEN)
        .with_request_timeout(Duration::from_secs(2));

    let record = executor(&config).execute(&item(), 0).await.unwrap();
    assert!(matches!(record.outcome(), Outcome::NetworkError { .. }));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_slow_create(Duration::from_millis(800)).await;

    let config = fixture
        .config()
        .with_request_timeout(Duration::from_millis(150));
    let record = executor(&config).execute(&item(), 0).await.unwrap();
    assert_eq!(record.outcome(), &Outcome::Timeout);
}
