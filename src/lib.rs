//! # bulk-events
//!
//! 面向事件创建 API 的高并发批量客户端：有界并发、退避重试、限流感知与运行指标汇总。
//!
//! A bulk-operation client for a remote event-creation API. It issues many
//! independent write requests against a rate-limited, occasionally failing
//! backend while bounding concurrency, retrying transient failures with
//! backoff, honoring server `Retry-After` hints, and aggregating latency,
//! throughput and error metrics.
//!
//! ## Core Ideas
//!
//! - **Outcomes, not exceptions**: every network attempt yields exactly one
//!   [`types::Outcome`]; only fatal conditions surface as [`Error`]
//! - **Explicit state machine**: each item owns its retry loop, and
//!   [`resilience::RetryPolicy::decide`] is the single termination point
//! - **Run-scoped metrics**: one [`metrics::MetricsAggregator`] per run, no globals
//! - **Partial completion is normal**: a run always produces a report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulk_events::EventClientBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> bulk_events::Result<()> {
//!     let client = EventClientBuilder::new()
//!         .base_url("http://localhost:8000/v1/calendar")
//!         .max_concurrent(50)
//!         .batch_size(20)
//!         .build()?;
//!
//!     let payloads = (0..100)
//!         .map(|i| json!({ "title": format!("Event {i}") }))
//!         .collect();
//!     let outcome = client.create_events(payloads).await?;
//!     println!("{}", outcome.metrics);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `EventClient` facade and builder |
//! | [`batch`] | Sequential batches, per-item retry loops, cancellation |
//! | [`executor`] | One network attempt per call, outcome classification |
//! | [`resilience`] | Retry policy and concurrency limiter |
//! | [`metrics`] | Run-scoped counters, latency stats, report |
//! | [`transport`] | Pooled HTTP client and credential lookup |
//! | [`config`] | Defaults, YAML and environment configuration |
//! | [`types`] | Work items, outcomes, reports |

pub mod batch;
pub mod client;
pub mod config;
pub mod executor;
pub mod metrics;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use batch::{BatchScheduler, RunOutcome};
pub use client::{EventClient, EventClientBuilder};
pub use config::ClientConfig;
pub use executor::{HttpExecutor, RequestExecutor};
pub use metrics::{MetricsAggregator, RunMetrics};
pub use resilience::{ConcurrencyLimiter, RetryPolicy};
pub use types::{ItemId, ItemReport, ItemStatus, Outcome, WorkItem};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

pub use tokio_util::sync::CancellationToken;
