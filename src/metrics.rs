//! 指标模块：运行范围内的线程安全计数与延迟统计。
//!
//! Run metrics.
//!
//! A [`MetricsAggregator`] lives for one run and is shared by every task of
//! that run. All updates are additive and commutative: counters are atomics,
//! latency samples are appended under a short mutex.

use crate::types::{AttemptRecord, ItemReport, ItemStatus, Outcome};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Latency summary over successful attempts only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    #[serde(rename = "mean_ms", serialize_with = "as_millis")]
    pub mean: Duration,
    #[serde(rename = "min_ms", serialize_with = "as_millis")]
    pub min: Duration,
    #[serde(rename = "max_ms", serialize_with = "as_millis")]
    pub max: Duration,
}

impl LatencyStats {
    pub fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let sum: Duration = samples.iter().sum();
        Self {
            count: samples.len(),
            mean: sum / samples.len() as u32,
            min: samples.iter().min().copied().unwrap_or_default(),
            max: samples.iter().max().copied().unwrap_or_default(),
        }
    }
}

/// Point-in-time summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    pub total_items: u64,
    pub successful: u64,
    /// Includes `cancelled`.
    pub failed: u64,
    pub cancelled: u64,
    /// 429 responses observed across all attempts.
    pub rate_limited: u64,
    pub retries: u64,
    pub attempts: u64,
    pub server_errors: u64,
    pub network_errors: u64,
    pub timeouts: u64,
    pub latency: LatencyStats,
    pub started_at: SystemTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<SystemTime>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Successful items per second of wall-clock time.
    pub throughput: f64,
}

impl RunMetrics {
    pub fn success_rate(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            self.successful as f64 / self.total_items as f64
        }
    }
}

impl fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        writeln!(f, "Events created:    {} / {}", self.successful, self.total_items)?;
        writeln!(f, "Success rate:      {:.1}%", self.success_rate() * 100.0)?;
        writeln!(f, "Failed:            {} ({} cancelled)", self.failed, self.cancelled)?;
        writeln!(f, "Rate limited:      {}", self.rate_limited)?;
        writeln!(f, "Retries:           {} over {} attempts", self.retries, self.attempts)?;
        writeln!(
            f,
            "Errors:            {} server, {} network, {} timeout",
            self.server_errors, self.network_errors, self.timeouts
        )?;
        writeln!(f, "Total time:        {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Throughput:        {:.2} events/s", self.throughput)?;
        write!(
            f,
            "Latency:           min {:.1}ms / mean {:.1}ms / max {:.1}ms",
            ms(self.latency.min),
            ms(self.latency.mean),
            ms(self.latency.max)
        )
    }
}

/// Run-scoped, thread-safe accumulator.
///
/// Every submitted item must be passed to [`record_terminal`](Self::record_terminal)
/// exactly once; intermediate attempts go through
/// [`record_attempt`](Self::record_attempt) and [`record_retry`](Self::record_retry).
#[derive(Debug)]
pub struct MetricsAggregator {
    started: Instant,
    started_at: SystemTime,
    finished: Mutex<Option<(Instant, SystemTime)>>,
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    rate_limited: AtomicU64,
    retries: AtomicU64,
    attempts: AtomicU64,
    server_errors: AtomicU64,
    network_errors: AtomicU64,
    timeouts: AtomicU64,
    latencies: Mutex<Vec<Duration>>,
}

impl MetricsAggregator {
    /// Start the run clock.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: SystemTime::now(),
            finished: Mutex::new(None),
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            network_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn record_attempt(&self, record: &AttemptRecord) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let counter = match record.outcome() {
            Outcome::RateLimited { .. } => &self.rate_limited,
            Outcome::ServerError { .. } => &self.server_errors,
            Outcome::NetworkError { .. } => &self.network_errors,
            Outcome::Timeout => &self.timeouts,
            Outcome::Success { .. } | Outcome::ClientError { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_terminal(&self, report: &ItemReport) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match report.status {
            ItemStatus::Succeeded => {
                self.successful.fetch_add(1, Ordering::Relaxed);
                if let Some(Outcome::Success { latency, .. }) = &report.outcome {
                    self.latencies
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(*latency);
                }
            }
            ItemStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            ItemStatus::Cancelled => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Stop the run clock. Later calls keep the first end time.
    pub fn finish(&self) {
        let mut finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        if finished.is_none() {
            *finished = Some((Instant::now(), SystemTime::now()));
        }
    }

    pub fn snapshot(&self) -> RunMetrics {
        let finished = *self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = match finished {
            Some((end, _)) => end.duration_since(self.started),
            None => self.started.elapsed(),
        };
        let latency = {
            let samples = self.latencies.lock().unwrap_or_else(PoisonError::into_inner);
            LatencyStats::from_samples(&samples)
        };
        let successful = self.successful.load(Ordering::Relaxed);
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            successful as f64 / secs
        } else {
            0.0
        };

        RunMetrics {
            total_items: self.total.load(Ordering::Relaxed),
            successful,
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            latency,
            started_at: self.started_at,
            finished_at: finished.map(|(_, wall)| wall),
            elapsed,
            throughput,
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
