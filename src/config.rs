//! 配置模块：默认值、YAML 文件加载与环境变量覆盖。
//!
//! Client configuration.
//!
//! Sources are layered, later wins: built-in defaults, an optional YAML file,
//! `BULK_EVENTS_*` environment variables, then builder overrides.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoint root; `/events` and `/status` are appended.
    pub base_url: String,
    pub max_concurrent: usize,
    pub batch_size: usize,
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub base_backoff_ms: u64,
    /// Upper bound (exclusive) of the uniform jitter added to backoff.
    pub max_jitter_ms: u64,
    pub inter_batch_pause_ms: u64,
    pub pool_max_idle_per_host: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1/calendar".to_string(),
            max_concurrent: 50,
            batch_size: 20,
            max_retries: 3,
            request_timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
            base_backoff_ms: 1_000,
            max_jitter_ms: 1_000,
            inter_batch_pause_ms: 100,
            pool_max_idle_per_host: 32,
            api_token: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `BULK_EVENTS_*` environment variables on top of the current values.
    ///
    /// Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("BULK_EVENTS_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Some(v) = env_parse("BULK_EVENTS_MAX_CONCURRENT") {
            self.max_concurrent = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_BATCH_SIZE") {
            self.batch_size = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_MAX_RETRIES") {
            self.max_retries = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_TIMEOUT_MS") {
            self.request_timeout_ms = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_BASE_BACKOFF_MS") {
            self.base_backoff_ms = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_MAX_JITTER_MS") {
            self.max_jitter_ms = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_INTER_BATCH_PAUSE_MS") {
            self.inter_batch_pause_ms = v;
        }
        if let Some(v) = env_parse("BULK_EVENTS_POOL_MAX_IDLE_PER_HOST") {
            self.pool_max_idle_per_host = v;
        }
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout_ms = millis(d);
        self
    }

    pub fn with_connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout_ms = millis(d);
        self
    }

    pub fn with_base_backoff(mut self, d: Duration) -> Self {
        self.base_backoff_ms = millis(d);
        self
    }

    pub fn with_max_jitter(mut self, d: Duration) -> Self {
        self.max_jitter_ms = millis(d);
        self
    }

    pub fn with_inter_batch_pause(mut self, d: Duration) -> Self {
        self.inter_batch_pause_ms = millis(d);
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }

    pub fn inter_batch_pause(&self) -> Duration {
        Duration::from_millis(self.inter_batch_pause_ms)
    }

    /// Reject settings that would make a run meaningless or unbuildable.
    pub fn validate(&self) -> Result<()> {
        fn invalid(field: &str, msg: &str, details: String) -> Error {
            Error::configuration_with_context(
                msg,
                ErrorContext::new()
                    .with_field_path(format!("config.{}", field))
                    .with_details(details)
                    .with_source("config_validator"),
            )
        }

        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            invalid("base_url", "base URL is not a valid URL", e.to_string())
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(invalid(
                "base_url",
                "base URL must use http or https",
                format!("scheme: {}", parsed.scheme()),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(invalid(
                "max_concurrent",
                "max concurrent requests must be at least 1",
                "got 0".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(invalid(
                "batch_size",
                "batch size must be at least 1",
                "got 0".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid(
                "request_timeout_ms",
                "request timeout must be non-zero",
                "got 0".into(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(invalid(
                "connect_timeout_ms",
                "connect timeout must be non-zero",
                "got 0".into(),
            ));
        }
        Ok(())
    }
}
