use crate::batch::{BatchScheduler, RunOutcome};
use crate::config::ClientConfig;
use crate::executor::{HttpExecutor, RequestExecutor};
use crate::resilience::LimiterSnapshot;
use crate::transport::HttpTransport;
use crate::types::WorkItem;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Bulk client for the event-creation API.
pub struct EventClient {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) executor: Arc<dyn RequestExecutor>,
    /// Always the network executor, even when `executor` is swapped.
    pub(crate) reader: Arc<HttpExecutor>,
    pub(crate) scheduler: BatchScheduler,
}

impl EventClient {
    pub fn builder() -> crate::client::EventClientBuilder {
        crate::client::EventClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Current admission state of the shared limiter.
    pub fn limiter_snapshot(&self) -> LimiterSnapshot {
        self.scheduler.limiter().snapshot()
    }

    /// Create one event per payload; ids are the payload positions.
    pub async fn create_events(&self, payloads: Vec<serde_json::Value>) -> Result<RunOutcome> {
        self.create_items(WorkItem::enumerate(payloads)).await
    }

    pub async fn create_items(&self, items: Vec<WorkItem>) -> Result<RunOutcome> {
        self.create_items_with_cancel(items, &CancellationToken::new())
            .await
    }

    /// Like [`create_items`](Self::create_items), stopping early once `cancel` fires.
    ///
    /// A cancelled run still returns `Ok` with a report for every item.
    pub async fn create_items_with_cancel(
        &self,
        items: Vec<WorkItem>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        info!(base_url = %self.base_url(), items = items.len(), "creating events");
        self.scheduler
            .run(self.executor.as_ref(), items, cancel)
            .await
    }

    /// `GET /events?days_ahead=N`, retried under the run's retry policy.
    pub async fn list_events(&self, days_ahead: u32) -> Result<serde_json::Value> {
        self.reader
            .get_json(
                "/events",
                &[("days_ahead", days_ahead.to_string())],
                self.scheduler.policy(),
            )
            .await
    }

    /// `GET /status`, retried under the run's retry policy.
    pub async fn status(&self) -> Result<serde_json::Value> {
        self.reader
            .get_json("/status", &[], self.scheduler.policy())
            .await
    }
}
