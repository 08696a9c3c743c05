use crate::{Error, ErrorContext, Result};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_flight: usize,
    /// Highest `in_flight` observed since creation.
    pub peak_in_flight: usize,
    /// Total admissions granted since creation.
    pub admitted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    admitted: AtomicU64,
}

/// Bounds the number of attempts in flight at once.
///
/// Backed by a FIFO-fair `tokio::sync::Semaphore`, so waiters are admitted
/// in arrival order and cannot starve. Cloning shares the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
    counters: Arc<Counters>,
}

/// One admission slot. Dropping it releases the slot, on every exit path.
#[derive(Debug)]
pub struct AdmissionPermit {
    counters: Arc<Counters>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        // Runs before `_permit` returns the slot, so in_flight never exceeds max.
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyLimiter {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<AdmissionPermit> {
        let permit = self.semaphore.clone().acquire_owned().await.map_err(|_| {
            Error::runtime_with_context(
                "Concurrency limiter closed",
                ErrorContext::new().with_source("limiter"),
            )
        })?;
        Ok(self.admit(permit))
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);
        self.counters.admitted.fetch_add(1, Ordering::Relaxed);
        AdmissionPermit {
            counters: self.counters.clone(),
            _permit: permit,
        }
    }

    /// Stop admitting; pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot {
            max: self.max,
            available: self.semaphore.available_permits(),
            in_flight: self.counters.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.counters.peak.load(Ordering::SeqCst),
            admitted: self.counters.admitted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_is_clamped_to_one() {
        assert_eq!(ConcurrencyLimiter::new(0).max(), 1);
    }

    #[tokio::test]
    async fn test_try_acquire_respects_limit() {
        let limiter = ConcurrencyLimiter::new(2);
        let a = limiter.try_acquire();
        let b = limiter.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert!(limiter.try_acquire().is_none());

        let snap = limiter.snapshot();
        assert_eq!(snap.in_flight, 2);
        assert_eq!(snap.available, 0);

        drop(a);
        assert_eq!(limiter.snapshot().in_flight, 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_release_on_drop_wakes_waiter() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(limiter.snapshot().admitted, 2);
        assert_eq!(limiter.snapshot().in_flight, 0);
    }

    #[tokio::test]
    async fn test_peak_never_exceeds_max() {
        let limiter = ConcurrencyLimiter::new(4);
        let mut handles = Vec::new();
        for _ in 0..64 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                let _slot = limiter.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_millis(2)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let snap = limiter.snapshot();
        assert_eq!(snap.admitted, 64);
        assert!(snap.peak_in_flight <= 4);
        assert_eq!(snap.in_flight, 0);
        assert_eq!(snap.available, 4);
    }

    #[tokio::test]
    async fn test_closed_limiter_is_an_error() {
        let limiter = ConcurrencyLimiter::new(1);
        limiter.close();
        assert!(matches!(limiter.acquire().await, Err(Error::Runtime { .. })));
    }

    #[tokio::test]
    async fn test_slot_released_when_future_is_cancelled() {
        let limiter = ConcurrencyLimiter::new(1);
        let task = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _slot = limiter.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(limiter.snapshot().in_flight, 1);

        task.abort();
        let _ = task.await;
        assert_eq!(limiter.snapshot().in_flight, 0);
        assert!(limiter.try_acquire().is_some());
    }
}
