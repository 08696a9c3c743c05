//! 批处理模块：将工作项划分为顺序批次，并在批内并发执行。
//!
//! # Batch Scheduling Module
//!
//! Splits an ordered work set into `ceil(total / batch_size)` batches that run
//! strictly one after another. Inside a batch, every item runs concurrently
//! through the [`ConcurrencyLimiter`](crate::resilience::ConcurrencyLimiter)
//! and carries its own retry loop.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchScheduler`] | Drives batches, retries and cancellation |
//! | [`BatchConfig`] | Batch size and inter-batch pause |
//! | [`RunOutcome`] | Per-item reports (input order) plus run metrics |

mod scheduler;

pub use scheduler::{batch_count, BatchConfig, BatchScheduler, RunOutcome};
