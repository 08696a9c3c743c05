//! Attempt outcomes, attempt records and retry decisions.

use super::item::ItemId;
use serde::{Serialize, Serializer};
use std::time::{Duration, SystemTime};

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Classified result of one network attempt. Exactly one variant per attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// 2xx response. `latency` covers the network call only.
    Success {
        payload: serde_json::Value,
        #[serde(rename = "latency_ms", serialize_with = "as_millis")]
        latency: Duration,
    },
    /// 429 response; `retry_after` is the server's wait hint (1s when absent).
    RateLimited {
        #[serde(rename = "retry_after_ms", serialize_with = "as_millis")]
        retry_after: Duration,
    },
    /// 5xx response.
    ServerError {
        status: u16,
        #[serde(rename = "latency_ms", serialize_with = "as_millis")]
        latency: Duration,
    },
    /// Any other non-2xx status. Never retried.
    ClientError { status: u16 },
    /// Connection-level failure (refused, reset, DNS, broken body).
    NetworkError { cause: String },
    /// The attempt exceeded its deadline.
    Timeout,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Transient outcomes that the retry policy may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::RateLimited { .. }
                | Outcome::ServerError { .. }
                | Outcome::NetworkError { .. }
                | Outcome::Timeout
        )
    }

    /// Stable short name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::RateLimited { .. } => "rate_limited",
            Outcome::ServerError { .. } => "server_error",
            Outcome::ClientError { .. } => "client_error",
            Outcome::NetworkError { .. } => "network_error",
            Outcome::Timeout => "timeout",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Success { .. } => Some(200),
            Outcome::RateLimited { .. } => Some(429),
            Outcome::ServerError { status, .. } | Outcome::ClientError { status } => Some(*status),
            Outcome::NetworkError { .. } | Outcome::Timeout => None,
        }
    }

    /// Latency of the network call, when a response was received and timed.
    pub fn latency(&self) -> Option<Duration> {
        match self {
            Outcome::Success { latency, .. } | Outcome::ServerError { latency, .. } => {
                Some(*latency)
            }
            _ => None,
        }
    }
}

/// Immutable record of a single attempt.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    item_id: ItemId,
    attempt: u32,
    outcome: Outcome,
    started_at: SystemTime,
    finished_at: SystemTime,
}

impl AttemptRecord {
    pub fn new(
        item_id: ItemId,
        attempt: u32,
        outcome: Outcome,
        started_at: SystemTime,
        finished_at: SystemTime,
    ) -> Self {
        Self {
            item_id,
            attempt,
            outcome,
            started_at,
            finished_at,
        }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// 0-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn finished_at(&self) -> SystemTime {
        self.finished_at
    }

    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }
}

/// Decision produced by the retry policy after each attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Retry { after: Duration },
    GiveUp(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded,
    Failed,
    /// The run was cancelled before this item made any attempt.
    Cancelled,
}

/// Terminal record for one work item. Exactly one per submitted item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub id: ItemId,
    pub status: ItemStatus,
    /// Attempts actually sent (0 when cancelled before starting).
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl ItemReport {
    pub fn finished(id: ItemId, attempts: u32, outcome: Outcome) -> Self {
        let status = if outcome.is_success() {
            ItemStatus::Succeeded
        } else {
            ItemStatus::Failed
        };
        Self {
            id,
            status,
            attempts,
            outcome: Some(outcome),
        }
    }

    pub fn cancelled(id: ItemId) -> Self {
        Self {
            id,
            status: ItemStatus::Cancelled,
            attempts: 0,
            outcome: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Succeeded
    }
}
