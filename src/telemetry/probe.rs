/*!
 * Pool Probe
 * Scheduler introspection behind a trait seam, so the sampler can be fed a
 * failure-injecting probe in tests
 */

use crate::core::errors::ProbeError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeMetrics};

/// One reading of the scheduler's thread accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub max_workers: usize,
    pub idle_workers: usize,
}

impl PoolSnapshot {
    /// Actively executing worker threads
    pub fn running(&self) -> i32 {
        self.max_workers
            .saturating_sub(self.idle_workers)
            .min(i32::MAX as usize) as i32
    }
}

/// Shared count of blocking-pool threads currently held by a pending wait.
/// The runtime's stable metrics do not cover the blocking pool, so the
/// harness keeps its own accounting: each blocking task holds a
/// [`WorkerGuard`] for exactly as long as it occupies a pool thread.
#[derive(Debug, Clone, Default)]
pub struct WorkerGauge {
    occupied: Arc<AtomicUsize>,
}

impl WorkerGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one pool thread occupied until the guard drops
    pub fn occupy(&self) -> WorkerGuard {
        self.occupied.fetch_add(1, Ordering::Relaxed);
        WorkerGuard {
            occupied: Arc::clone(&self.occupied),
        }
    }

    pub fn count(&self) -> usize {
        self.occupied.load(Ordering::Relaxed)
    }
}

/// RAII release of one occupied slot
pub struct WorkerGuard {
    occupied: Arc<AtomicUsize>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.occupied.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Source of occupancy readings. `sample` is fallible so that transient
/// introspection failures stay inside the sampler's resilience policy.
pub trait PoolProbe: Send + Sync + 'static {
    fn sample(&self) -> Result<PoolSnapshot, ProbeError>;
}

/// Probe combining the runtime's core worker count with the gauge of
/// occupied blocking-pool threads. Core workers are counted as busy, so a
/// suspending run reads as a flat `worker_threads` while pending waits pile
/// up, and a blocking run's reading grows with every occupied blocking
/// thread. That is the contrast the benchmark reports.
pub struct RuntimeProbe {
    metrics: RuntimeMetrics,
    gauge: WorkerGauge,
}

impl RuntimeProbe {
    pub fn new(handle: &Handle, gauge: WorkerGauge) -> Self {
        Self {
            metrics: handle.metrics(),
            gauge,
        }
    }
}

impl PoolProbe for RuntimeProbe {
    fn sample(&self) -> Result<PoolSnapshot, ProbeError> {
        Ok(PoolSnapshot {
            max_workers: self.metrics.num_workers() + self.gauge.count(),
            idle_workers: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_is_max_minus_idle() {
        let snapshot = PoolSnapshot {
            max_workers: 12,
            idle_workers: 4,
        };
        assert_eq!(snapshot.running(), 8);
    }

    #[test]
    fn test_running_saturates() {
        let snapshot = PoolSnapshot {
            max_workers: 2,
            idle_workers: 5,
        };
        assert_eq!(snapshot.running(), 0);
    }

    #[test]
    fn test_gauge_tracks_guard_lifetimes() {
        let gauge = WorkerGauge::new();
        assert_eq!(gauge.count(), 0);
        let first = gauge.occupy();
        let second = gauge.occupy();
        assert_eq!(gauge.count(), 2);
        drop(first);
        assert_eq!(gauge.count(), 1);
        drop(second);
        assert_eq!(gauge.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 3)]
    async fn test_runtime_probe_counts_core_workers() {
        let gauge = WorkerGauge::new();
        let probe = RuntimeProbe::new(&Handle::current(), gauge.clone());
        assert_eq!(probe.sample().unwrap().running(), 3);

        let _held = gauge.occupy();
        assert_eq!(probe.sample().unwrap().running(), 4);
    }
}
