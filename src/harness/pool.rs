/*!
 * Pool Sizer
 *
 * Builds the worker pool with explicit thread counts before a run. Default
 * pool growth is demand-driven and would otherwise show up inside the
 * latency numbers as thread-injection delay, so both the core worker count
 * and the blocking-pool ceiling are fixed up front.
 */

use crate::core::config::HarnessConfig;
use crate::core::errors::HarnessError;
use crate::core::types::BLOCKING_HEADROOM;
use crate::sync::WaitStrategy;
use tokio::runtime::Runtime;
use tracing::info;

/// Explicit thread counts for one run's scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizer {
    pub worker_threads: usize,
    pub max_blocking_threads: usize,
}

impl PoolSizer {
    /// Size the pool for a run. Suspending runs get exactly the configured
    /// minimum as core workers, which is also the occupancy ceiling the
    /// benchmark expects to observe. Blocking runs keep the core pool at
    /// hardware parallelism (it only runs orchestration) and size the
    /// blocking pool to hold every waiting task at once.
    pub fn for_run(config: &HarnessConfig, strategy: &WaitStrategy) -> Self {
        if strategy.suspending {
            Self {
                worker_threads: config.min_workers,
                max_blocking_threads: BLOCKING_HEADROOM,
            }
        } else {
            let parallelism = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            Self {
                worker_threads: config.min_workers.min(parallelism),
                max_blocking_threads: config
                    .min_workers
                    .max(config.task_count + BLOCKING_HEADROOM),
            }
        }
    }

    /// Build the runtime. Failure here is process-fatal: without a sized
    /// pool there is nothing meaningful to measure.
    pub fn build(&self) -> Result<Runtime, HarnessError> {
        info!(
            worker_threads = self.worker_threads,
            max_blocking_threads = self.max_blocking_threads,
            "sizing worker pool"
        );
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.worker_threads)
            .max_blocking_threads(self.max_blocking_threads)
            .thread_name("stampede-worker")
            .enable_all()
            .build()
            .map_err(|e| HarnessError::PoolBuild(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RunMode;
    use std::time::Duration;

    fn config(task_count: usize, min_workers: usize, mode: RunMode) -> HarnessConfig {
        HarnessConfig {
            task_count,
            min_workers,
            mode,
            wait_timeout: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(2),
            sample_interval: Duration::from_millis(250),
            channel_name: "/stampede-test".into(),
            compare_dedicated: false,
            auto_release: true,
        }
    }

    #[test]
    fn test_suspending_run_gets_exact_workers() {
        let strategy = WaitStrategy::suspending_event(Duration::from_secs(1));
        let sizer = PoolSizer::for_run(&config(1000, 4, RunMode::Suspending), &strategy);
        assert_eq!(sizer.worker_threads, 4);
    }

    #[test]
    fn test_blocking_run_sizes_blocking_pool_for_all_tasks() {
        let strategy = WaitStrategy::blocking_semaphore(Duration::from_secs(1));
        let sizer = PoolSizer::for_run(&config(1000, 100, RunMode::Blocking), &strategy);
        assert!(sizer.max_blocking_threads >= 1000 + BLOCKING_HEADROOM);
    }

    #[test]
    fn test_build_produces_working_runtime() {
        let sizer = PoolSizer {
            worker_threads: 2,
            max_blocking_threads: 4,
        };
        let runtime = sizer.build().unwrap();
        assert_eq!(runtime.block_on(async { 7 }), 7);
    }
}
