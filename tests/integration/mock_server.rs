//! Mock HTTP server setup for integration tests

use bulk_events::{ClientConfig, EventClientBuilder};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const TEST_TOKEN: &str = "test-token";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Config pointing at the mock server with fast, jitter-free retries.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_base_url(&self.base_url)
            .with_api_token(TEST_TOKEN)
            .with_request_timeout(Duration::from_secs(2))
            .with_base_backoff(Duration::from_millis(1))
            .with_max_jitter(Duration::ZERO)
            .with_inter_batch_pause(Duration::ZERO)
    }

    pub fn client_builder(&self) -> EventClientBuilder {
        EventClientBuilder::new().with_config(self.config())
    }

    /// `POST /events` answered with `status` and a JSON body, expected `hits` times.
    pub async fn mock_create(&self, status: usize, body: &str, hits: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/events")
            .match_header("authorization", format!("Bearer {TEST_TOKEN}").as_str())
            .match_header("x-request-id", Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// `POST /events` for payloads containing `partial`.
    pub async fn mock_create_matching(
        &self,
        partial: serde_json::Value,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/events")
            .match_body(Matcher::PartialJson(partial))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// `POST /events` answered with 429, optionally carrying `Retry-After`.
    pub async fn mock_rate_limited(&self, retry_after: Option<&str>, hits: usize) -> Mock {
        let mut server = self.server.lock().await;
        let mut mock = server
            .mock("POST", "/events")
            .expect(hits)
            .with_status(429)
            .with_body(r#"{"detail":"Too Many Requests"}"#);
        if let Some(value) = retry_after {
            mock = mock.with_header("retry-after", value);
        }
        mock.create_async().await
    }

    /// `POST /events` whose body arrives after `delay`.
    pub async fn mock_slow_create(&self, delay: Duration) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/events")
            .with_status(201)
            .with_chunked_body(move |w| {
                std::thread::sleep(delay);
                w.write_all(b"{}")
            })
            .create_async()
            .await
    }

    /// `GET path` returning JSON.
    pub async fn mock_get(
        &self,
        path: &str,
        query: Matcher,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("GET", path)
            .match_query(query)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}
