/*!
 * Harness Types
 * Per-task records and per-run aggregates
 */

use crate::core::types::TaskIndex;
use crate::sync::WaitOutcome;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Timing record for one unit of work. Created by the task that ran it and
/// sent to the collector exactly once, at completion; read-only afterwards.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub index: TaskIndex,
    /// When the fan-out submitted the task to the scheduler
    pub submitted_at: Instant,
    /// When the task body first ran on a worker
    pub started_at: Instant,
    /// When the wait returned
    pub woke_at: Instant,
    /// When the task finished its post-wake work
    pub completed_at: Instant,
    pub outcome: WaitOutcome,
}

/// The single release point of a run, stamped immediately before the first
/// signal call
#[derive(Debug, Clone, Copy)]
pub struct ReleasePoint {
    pub released_at: Instant,
    /// Primitives signaled successfully
    pub signaled: usize,
    /// Primitives found disposed; their tasks resolve to TimedOut
    pub disposed: usize,
}

impl ReleasePoint {
    /// A release point for runs that skip the barrier (tasks that never wait)
    pub fn immediate() -> Self {
        Self {
            released_at: Instant::now(),
            signaled: 0,
            disposed: 0,
        }
    }
}

/// How the drain itself ended, distinct from per-task outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Every expected record arrived
    Drained,
    /// The global drain timeout elapsed first
    TimedOut,
    /// The process-wide cancellation fired mid-drain
    Canceled,
}

/// Aggregate over one full fan-out, immutable once produced
#[derive(Debug, Clone)]
pub struct RunResult {
    pub task_count: usize,
    /// Records actually collected; less than `task_count` only when the
    /// drain timed out or was canceled
    pub collected: usize,
    /// Release point to final completion
    pub drain_duration: Duration,
    /// Per-task wake latencies, ordered by task index
    pub latencies: Vec<Duration>,
    pub timed_out: usize,
    pub canceled: usize,
    pub outcome: DrainOutcome,
}

impl RunResult {
    pub fn report(&self) -> RunReport {
        let to_ms = |d: &Duration| d.as_secs_f64() * 1e3;
        let (min_ms, max_ms) = self
            .latencies
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, d| {
                let ms = to_ms(d);
                Some(match acc {
                    Some((min, max)) => (min.min(ms), max.max(ms)),
                    None => (ms, ms),
                })
            })
            .unwrap_or((0.0, 0.0));
        let mean_ms = if self.latencies.is_empty() {
            0.0
        } else {
            self.latencies.iter().map(to_ms).sum::<f64>() / self.latencies.len() as f64
        };

        RunReport {
            task_count: self.task_count,
            collected: self.collected,
            drain_ms: self.drain_duration.as_millis() as u64,
            timed_out: self.timed_out,
            canceled: self.canceled,
            outcome: self.outcome,
            wake_latency_min_ms: min_ms,
            wake_latency_mean_ms: mean_ms,
            wake_latency_max_ms: max_ms,
        }
    }
}

/// Serializable run summary, printed as JSON at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub task_count: usize,
    pub collected: usize,
    pub drain_ms: u64,
    pub timed_out: usize,
    pub canceled: usize,
    pub outcome: DrainOutcome,
    pub wake_latency_min_ms: f64,
    pub wake_latency_mean_ms: f64,
    pub wake_latency_max_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summarizes_latencies() {
        let result = RunResult {
            task_count: 3,
            collected: 3,
            drain_duration: Duration::from_millis(300),
            latencies: vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(60),
            ],
            timed_out: 0,
            canceled: 0,
            outcome: DrainOutcome::Drained,
        };
        let report = result.report();
        assert_eq!(report.drain_ms, 300);
        assert_eq!(report.wake_latency_min_ms, 10.0);
        assert_eq!(report.wake_latency_max_ms, 60.0);
        assert_eq!(report.wake_latency_mean_ms, 30.0);
    }

    #[test]
    fn test_report_handles_empty_run() {
        let result = RunResult {
            task_count: 0,
            collected: 0,
            drain_duration: Duration::ZERO,
            latencies: Vec::new(),
            timed_out: 0,
            canceled: 0,
            outcome: DrainOutcome::Drained,
        };
        let report = result.report();
        assert_eq!(report.wake_latency_mean_ms, 0.0);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"outcome\":\"drained\""));
    }
}
