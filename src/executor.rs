//! 请求执行器：单次网络尝试，并将结果分类为 Outcome。
//!
//! Request execution (single attempt).
//!
//! An executor performs exactly one network call per invocation and never
//! retries. Expected failure modes (non-2xx, deadline exceeded, connection
//! failures) come back as [`Outcome`] variants; only request-construction
//! problems are returned as [`Error`].
//!
//! [`HttpExecutor::get_json`] reuses the same classification for the read
//! endpoints and loops over it with a [`RetryPolicy`].

use crate::resilience::RetryPolicy;
use crate::transport::{HttpTransport, TransportError};
use crate::types::{AttemptRecord, Outcome, RetryDecision, WorkItem};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Wait hint used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Upper bound applied to server `Retry-After` hints.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// One attempt against the remote endpoint.
///
/// Higher-level retry loops live in the caller ([`crate::batch::BatchScheduler`]).
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, item: &WorkItem, attempt: u32) -> Result<AttemptRecord>;
}

/// Production executor: `POST /events` over the shared [`HttpTransport`].
pub struct HttpExecutor {
    transport: Arc<HttpTransport>,
    deadline: Duration,
}

impl HttpExecutor {
    pub fn new(transport: Arc<HttpTransport>, deadline: Duration) -> Self {
        Self {
            transport,
            deadline,
        }
    }

    async fn attempt_once(&self, item: &WorkItem, attempt: u32) -> Result<Outcome> {
        let request_id = Uuid::new_v4().to_string();
        let (outcome, latency) = send_classified(
            self.deadline,
            self.transport.post_event(item.payload(), &request_id),
        )
        .await?;

        match &outcome {
            Outcome::Success { .. } => debug!(
                item_id = %item.id(),
                attempt,
                request_id = request_id.as_str(),
                latency_ms = latency.as_millis() as u64,
                "event created"
            ),
            Outcome::ClientError { status } => info!(
                item_id = %item.id(),
                attempt,
                http_status = status,
                request_id = request_id.as_str(),
                "event rejected"
            ),
            Outcome::RateLimited { retry_after } => warn!(
                item_id = %item.id(),
                attempt,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limited"
            ),
            other => warn!(
                item_id = %item.id(),
                attempt,
                outcome = other.kind(),
                http_status = other.status(),
                duration_ms = latency.as_millis() as u64,
                "event attempt failed"
            ),
        }

        Ok(outcome)
    }

    /// `GET` a JSON document, retrying transient failures under `policy`.
    ///
    /// 429 waits for the server hint; 5xx, timeouts and connection failures
    /// back off. A final failure with an HTTP status becomes
    /// [`Error::Remote`], one without becomes [`Error::Transport`].
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
        policy: &RetryPolicy,
    ) -> Result<serde_json::Value> {
        let mut attempt = 0u32;
        loop {
            let request_id = Uuid::new_v4().to_string();
            let (outcome, _) = send_classified(
                self.deadline,
                self.transport.get(path, query, &request_id),
            )
            .await?;

            match policy.decide_outcome(&outcome, attempt) {
                RetryDecision::GiveUp(Outcome::Success { payload, .. }) => return Ok(payload),
                RetryDecision::GiveUp(last) => return Err(read_failure(path, attempt + 1, &last)),
                RetryDecision::Retry { after } => {
                    debug!(
                        path,
                        attempt,
                        outcome = outcome.kind(),
                        request_id = request_id.as_str(),
                        retry_in_ms = after.as_millis() as u64,
                        "retrying read"
                    );
                    tokio::time::sleep(after).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Await `send` under `deadline` and classify the response.
async fn send_classified<F>(deadline: Duration, send: F) -> Result<(Outcome, Duration)>
where
    F: Future<Output = reqwest::Result<reqwest::Response>>,
{
    let start = Instant::now();
    let call = async {
        let resp = send.await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        Ok::<_, reqwest::Error>((status, headers, body))
    };

    // reqwest enforces the same total timeout; this also bounds body reads.
    let result = tokio::time::timeout(deadline, call).await;
    let latency = start.elapsed();

    let outcome = match result {
        Err(_) => Outcome::Timeout,
        Ok(Err(e)) => classify_error(e)?,
        Ok(Ok((status, headers, body))) => classify_status(status, &headers, &body, latency),
    };
    Ok((outcome, latency))
}

fn read_failure(path: &str, attempts: u32, last: &Outcome) -> Error {
    let message = format!(
        "GET {path} failed after {attempts} attempt(s): {}",
        last.kind()
    );
    match last.status() {
        Some(status) => Error::Remote { status, message },
        None => Error::Transport(TransportError::Other(message)),
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, item: &WorkItem, attempt: u32) -> Result<AttemptRecord> {
        let started_at = SystemTime::now();
        let outcome = self.attempt_once(item, attempt).await?;
        Ok(AttemptRecord::new(
            item.id().clone(),
            attempt,
            outcome,
            started_at,
            SystemTime::now(),
        ))
    }
}

/// Map a transport failure to an outcome; builder errors are fatal.
fn classify_error(e: reqwest::Error) -> Result<Outcome> {
    if e.is_builder() {
        return Err(Error::Transport(TransportError::Http(e)));
    }
    if e.is_timeout() {
        return Ok(Outcome::Timeout);
    }
    Ok(Outcome::NetworkError {
        cause: e.to_string(),
    })
}

pub(crate) fn classify_status(
    status: u16,
    headers: &HeaderMap,
    body: &[u8],
    latency: Duration,
) -> Outcome {
    match status {
        200..=299 => Outcome::Success {
            payload: parse_body(body),
            latency,
        },
        429 => Outcome::RateLimited {
            retry_after: retry_after(headers).unwrap_or(DEFAULT_RETRY_AFTER),
        },
        500..=599 => Outcome::ServerError { status, latency },
        _ => Outcome::ClientError { status },
    }
}

fn parse_body(body: &[u8]) -> serde_json::Value {
    if body.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Best-effort parsing of `Retry-After`.
///
/// Only the delay-seconds form is supported (integer or decimal); HTTP-date
/// values are treated as absent. Hints are capped at [`MAX_RETRY_AFTER`].
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER));
    }
    let secs = raw.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let hint = Duration::try_from_secs_f64(secs).unwrap_or(MAX_RETRY_AFTER);
    Some(hint.min(MAX_RETRY_AFTER))
}
