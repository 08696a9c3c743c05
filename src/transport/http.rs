use crate::config::ClientConfig;
use crate::{Error, Result};
use std::time::Duration;
use tracing::debug;

use super::credentials::CredentialSource;

/// Pooled HTTP client bound to one event endpoint root.
///
/// The underlying `reqwest::Client` is shared by every attempt of a run, so
/// connections are reused across items and retries.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let builder = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .user_agent(concat!("bulk-events/", env!("CARGO_PKG_VERSION")));

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let host = url::Url::parse(&base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();
        let api_token = CredentialSource::new(config.api_token.clone()).resolve(&host);

        debug!(
            base_url = base_url.as_str(),
            authenticated = api_token.is_some(),
            "bulk-events transport ready"
        );

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one `POST /events`. Errors are returned raw so the caller can
    /// classify them (timeout, connect, builder).
    pub async fn post_event(
        &self,
        payload: &serde_json::Value,
        request_id: &str,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut req = self
            .client
            .post(self.url("/events"))
            .json(payload)
            .header("x-request-id", request_id);

        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        req.send().await
    }

    /// Send one `GET`. Like [`post_event`](Self::post_event), errors are
    /// returned raw for classification by the caller.
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        request_id: &str,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut req = self
            .client
            .get(self.url(path))
            .header("x-request-id", request_id);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        req.send().await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
