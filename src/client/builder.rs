use crate::batch::{BatchConfig, BatchScheduler};
use crate::client::core::EventClient;
use crate::config::ClientConfig;
use crate::executor::{HttpExecutor, RequestExecutor};
use crate::resilience::{ConcurrencyLimiter, RetryPolicy};
use crate::transport::HttpTransport;
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`EventClient`].
///
/// Starts from [`ClientConfig::default`]; every setter overrides one field.
pub struct EventClientBuilder {
    config: ClientConfig,
    executor: Option<Arc<dyn RequestExecutor>>,
}

impl Default for EventClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            executor: None,
        }
    }

    /// Replace the whole configuration (e.g. one loaded from YAML).
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a YAML file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = ClientConfig::from_yaml_file(path)?;
        Ok(self)
    }

    /// Apply `BULK_EVENTS_*` environment overrides on top of the current config.
    pub fn env_overrides(mut self) -> Self {
        self.config = self.config.with_env_overrides();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(url);
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config = self.config.with_max_concurrent(n);
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config = self.config.with_batch_size(n);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config = self.config.with_max_retries(n);
        self
    }

    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.config = self.config.with_request_timeout(d);
        self
    }

    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.config = self.config.with_connect_timeout(d);
        self
    }

    pub fn base_backoff(mut self, d: Duration) -> Self {
        self.config = self.config.with_base_backoff(d);
        self
    }

    pub fn max_jitter(mut self, d: Duration) -> Self {
        self.config = self.config.with_max_jitter(d);
        self
    }

    pub fn inter_batch_pause(mut self, d: Duration) -> Self {
        self.config = self.config.with_inter_batch_pause(d);
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config = self.config.with_api_token(token);
        self
    }

    /// Swap the network executor (primarily for tests and dry runs).
    pub fn executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<EventClient> {
        self.config.validate()?;

        let transport = Arc::new(HttpTransport::new(&self.config)?);
        let reader = Arc::new(HttpExecutor::new(
            transport.clone(),
            self.config.request_timeout(),
        ));
        let executor = self
            .executor
            .unwrap_or_else(|| reader.clone() as Arc<dyn RequestExecutor>);

        let scheduler = BatchScheduler::new(
            BatchConfig::from_config(&self.config),
            ConcurrencyLimiter::new(self.config.max_concurrent),
            RetryPolicy::from_config(&self.config),
        );

        Ok(EventClient {
            config: self.config,
            transport,
            executor,
            reader,
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_build_applies_overrides() {
        let client = EventClientBuilder::new()
            .base_url("http://127.0.0.1:9/v1/calendar/")
            .max_concurrent(7)
            .batch_size(3)
            .max_retries(1)
            .api_token("t")
            .build()
            .unwrap();

        assert_eq!(client.config().max_concurrent, 7);
        assert_eq!(client.config().batch_size, 3);
        assert_eq!(client.limiter_snapshot().max, 7);
        assert_eq!(client.base_url(), "http://127.0.0.1:9/v1/calendar");
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let err = EventClientBuilder::new()
            .batch_size(0)
            .api_token("t")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
