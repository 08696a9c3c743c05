use crate::config::ClientConfig;
use crate::types::{AttemptRecord, Outcome, RetryDecision};
use rand::Rng;
use std::time::Duration;

/// Retry / give-up rules for a single work item.
///
/// Rules, in order:
/// 1. success gives up with the success,
/// 2. client errors are never retried,
/// 3. once `attempt >= max_retries` the last outcome is final,
/// 4. rate limiting waits for the server hint,
/// 5. other transient failures wait `base_backoff * 2^attempt + jitter`.
///
/// Holds no per-item state; the same policy is shared by every item of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    /// Jitter is sampled uniformly from `[0, max_jitter)`.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: config.base_backoff(),
            max_jitter: config.max_jitter(),
        }
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_base_backoff(mut self, d: Duration) -> Self {
        self.base_backoff = d;
        self
    }

    pub fn with_max_jitter(mut self, d: Duration) -> Self {
        self.max_jitter = d;
        self
    }

    /// Decide what to do after `record`, sampling jitter when a backoff is needed.
    pub fn decide(&self, record: &AttemptRecord) -> RetryDecision {
        self.decide_outcome(record.outcome(), record.attempt())
    }

    /// [`decide`](Self::decide) for a bare outcome (reads keep no records).
    pub fn decide_outcome(&self, outcome: &Outcome, attempt: u32) -> RetryDecision {
        self.decide_inner(outcome, attempt, || self.sample_jitter())
    }

    /// Same rules as [`decide`](Self::decide) with the jitter supplied by the caller.
    pub fn decide_with_jitter(&self, outcome: &Outcome, attempt: u32, jitter: Duration) -> RetryDecision {
        self.decide_inner(outcome, attempt, || jitter)
    }

    fn decide_inner(
        &self,
        outcome: &Outcome,
        attempt: u32,
        jitter: impl FnOnce() -> Duration,
    ) -> RetryDecision {
        match outcome {
            Outcome::Success { .. } | Outcome::ClientError { .. } => {
                RetryDecision::GiveUp(outcome.clone())
            }
            _ if attempt >= self.max_retries => RetryDecision::GiveUp(outcome.clone()),
            Outcome::RateLimited { retry_after } => RetryDecision::Retry {
                after: *retry_after,
            },
            Outcome::ServerError { .. } | Outcome::NetworkError { .. } | Outcome::Timeout => {
                RetryDecision::Retry {
                    after: self.backoff(attempt, jitter()),
                }
            }
        }
    }

    /// `base_backoff * 2^attempt + jitter`, saturating on overflow.
    pub fn backoff(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .saturating_add(jitter)
    }

    fn sample_jitter(&self) -> Duration {
        let max = self.max_jitter.as_nanos().min(u64::MAX as u128) as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..max))
    }
}
