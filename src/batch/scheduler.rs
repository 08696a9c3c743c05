//! Batch scheduler.

use crate::config::ClientConfig;
use crate::executor::RequestExecutor;
use crate::metrics::{MetricsAggregator, RunMetrics};
use crate::resilience::{ConcurrencyLimiter, RetryPolicy};
use crate::types::{ItemReport, Outcome, RetryDecision, WorkItem};
use crate::{Error, ErrorContext, Result};
use futures::future::join_all;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Pause between consecutive batches (not after the last one).
    pub inter_batch_pause: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            inter_batch_pause: Duration::from_millis(100),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            inter_batch_pause: config.inter_batch_pause(),
        }
    }
    pub fn with_batch_size(mut self, s: usize) -> Self {
        self.batch_size = s;
        self
    }
    pub fn with_inter_batch_pause(mut self, d: Duration) -> Self {
        self.inter_batch_pause = d;
        self
    }
}

/// Number of batches needed for `total` items.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        0
    } else {
        (total + batch_size - 1) / batch_size
    }
}

/// Result of a whole run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// One report per submitted item, in input order.
    pub reports: Vec<ItemReport>,
    pub metrics: RunMetrics,
    pub batches: usize,
}

impl RunOutcome {
    pub fn successes(&self) -> impl Iterator<Item = &ItemReport> {
        self.reports.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.reports.iter().filter(|r| !r.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.reports.iter().all(|r| r.is_success())
    }
}

/// Drives work items through sequential batches.
///
/// Within a batch every item runs concurrently (bounded by the limiter) and
/// owns its retry loop; the next batch starts only after every item of the
/// current one has a terminal report.
pub struct BatchScheduler {
    config: BatchConfig,
    limiter: ConcurrencyLimiter,
    policy: RetryPolicy,
}

impl BatchScheduler {
    pub fn new(config: BatchConfig, limiter: ConcurrencyLimiter, policy: RetryPolicy) -> Self {
        Self {
            config,
            limiter,
            policy,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            BatchConfig::from_config(config),
            ConcurrencyLimiter::new(config.max_concurrent),
            RetryPolicy::from_config(config),
        )
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `items` to completion with a fresh metrics accumulator.
    pub async fn run<E>(
        &self,
        executor: &E,
        items: Vec<WorkItem>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome>
    where
        E: RequestExecutor + ?Sized,
    {
        let metrics = MetricsAggregator::new();
        self.run_with_metrics(executor, items, &metrics, cancel).await
    }

    /// Run `items`, accumulating into a caller-owned `metrics`.
    ///
    /// Returns `Err` only for fatal errors; per-item failures are reports.
    pub async fn run_with_metrics<E>(
        &self,
        executor: &E,
        items: Vec<WorkItem>,
        metrics: &MetricsAggregator,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome>
    where
        E: RequestExecutor + ?Sized,
    {
        if self.config.batch_size == 0 {
            return Err(Error::configuration_with_context(
                "batch size must be at least 1",
                ErrorContext::new()
                    .with_field_path("config.batch_size")
                    .with_source("batch_scheduler"),
            ));
        }

        let total = items.len();
        let batches = batch_count(total, self.config.batch_size);
        let run_token = cancel.child_token();
        let mut reports = Vec::with_capacity(total);
        let mut fatal: Option<Error> = None;
        let mut remaining = items.into_iter();

        info!(
            items = total,
            batches,
            batch_size = self.config.batch_size,
            max_concurrent = self.limiter.max(),
            "bulk run started"
        );

        for batch_no in 0..batches {
            let batch: Vec<WorkItem> = remaining.by_ref().take(self.config.batch_size).collect();

            if run_token.is_cancelled() {
                for item in batch {
                    let report = ItemReport::cancelled(item.id().clone());
                    metrics.record_terminal(&report);
                    reports.push(report);
                }
                continue;
            }

            debug!(batch = batch_no + 1, batches, size = batch.len(), "dispatching batch");

            let results = join_all(
                batch
                    .iter()
                    .map(|item| self.drive_item(executor, item, metrics, &run_token)),
            )
            .await;

            for result in results {
                match result {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        if fatal.is_none() {
                            fatal = Some(e);
                        }
                    }
                }
            }

            if fatal.is_some() {
                break;
            }

            if batch_no + 1 < batches && !self.config.inter_batch_pause.is_zero() {
                tokio::select! {
                    _ = run_token.cancelled() => {}
                    _ = tokio::time::sleep(self.config.inter_batch_pause) => {}
                }
            }
        }

        metrics.finish();

        if let Some(e) = fatal {
            warn!(error = %e, "bulk run aborted");
            return Err(e);
        }

        let snapshot = metrics.snapshot();
        info!(
            successful = snapshot.successful,
            failed = snapshot.failed,
            rate_limited = snapshot.rate_limited,
            retries = snapshot.retries,
            elapsed_ms = snapshot.elapsed.as_millis() as u64,
            cancelled = run_token.is_cancelled(),
            "bulk run finished"
        );

        Ok(RunOutcome {
            reports,
            metrics: snapshot,
            batches,
        })
    }

    /// Per-item state machine: admit, attempt, record, decide, then back off or stop.
    ///
    /// The admission slot is held for the attempt only, never across a backoff.
    async fn drive_item<E>(
        &self,
        executor: &E,
        item: &WorkItem,
        metrics: &MetricsAggregator,
        cancel: &CancellationToken,
    ) -> Result<ItemReport>
    where
        E: RequestExecutor + ?Sized,
    {
        let mut attempt: u32 = 0;
        let mut last: Option<Outcome> = None;

        loop {
            let slot = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(Self::interrupted(item, attempt, last, metrics));
                }
                slot = self.limiter.acquire() => slot,
            };
            let slot = match slot {
                Ok(slot) => slot,
                Err(e) => {
                    cancel.cancel();
                    return Err(e);
                }
            };

            let record = match executor.execute(item, attempt).await {
                Ok(record) => record,
                Err(e) => {
                    cancel.cancel();
                    return Err(e);
                }
            };
            drop(slot);
            metrics.record_attempt(&record);

            match self.policy.decide(&record) {
                RetryDecision::GiveUp(outcome) => {
                    if !outcome.is_success() {
                        warn!(
                            item_id = %item.id(),
                            attempts = attempt + 1,
                            outcome = outcome.kind(),
                            "giving up on item"
                        );
                    }
                    let report = ItemReport::finished(item.id().clone(), attempt + 1, outcome);
                    metrics.record_terminal(&report);
                    return Ok(report);
                }
                RetryDecision::Retry { after } => {
                    debug!(
                        item_id = %item.id(),
                        attempt,
                        outcome = record.outcome().kind(),
                        backoff_ms = after.as_millis() as u64,
                        "scheduling retry"
                    );
                    last = Some(record.into_outcome());
                    attempt += 1;

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Ok(Self::interrupted(item, attempt, last, metrics));
                        }
                        _ = tokio::time::sleep(after) => {}
                    }
                    metrics.record_retry();
                }
            }
        }
    }

    fn interrupted(
        item: &WorkItem,
        attempts: u32,
        last: Option<Outcome>,
        metrics: &MetricsAggregator,
    ) -> ItemReport {
        let report = match last {
            Some(outcome) => ItemReport::finished(item.id().clone(), attempts, outcome),
            None => ItemReport::cancelled(item.id().clone()),
        };
        metrics.record_terminal(&report);
        report
    }
}
