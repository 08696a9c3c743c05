//! 弹性模块：重试策略与并发限制。
//!
//! # Resilience Primitives Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`retry`] | Retry / give-up decisions with exponential backoff and server hints |
//! | [`limiter`] | Bounded in-flight admission with RAII slots |
//!
//! ```rust
//! use bulk_events::resilience::RetryPolicy;
//! use bulk_events::types::{Outcome, RetryDecision};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new().with_max_retries(2);
//! let decision = policy.decide_with_jitter(&Outcome::Timeout, 1, Duration::ZERO);
//! assert_eq!(decision, RetryDecision::Retry { after: Duration::from_secs(2) });
//! ```

pub mod limiter;
pub mod retry;

pub use limiter::{AdmissionPermit, ConcurrencyLimiter, LimiterSnapshot};
pub use retry::RetryPolicy;
