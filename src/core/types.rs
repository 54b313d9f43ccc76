/*!
 * Core Types
 * Common types, limits, and defaults used across the harness
 */

use std::time::Duration;

/// Index of a spawned task within one fan-out, unique in `[0, count)`
pub type TaskIndex = usize;

/// Tasks spawned per run unless overridden via `STAMPEDE_TASKS`
pub const DEFAULT_TASK_COUNT: usize = 1000;

/// Upper bound applied to the derived minimum worker count.
/// Matches the pool-sizing cap of the workload this harness reproduces.
pub const MIN_WORKERS_CAP: usize = 1000;

/// Per-task wait timeout (2 minutes). A wait that outlives this resolves to
/// `WaitOutcome::TimedOut`, which is a measured outcome rather than an error.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Extra wall-clock allowance for the drain beyond the wait timeout, covering
/// the post-wake simulated work and scheduling jitter.
pub const DRAIN_MARGIN: Duration = Duration::from_secs(5);

/// Occupancy sampling interval; also the monitor's poll interval
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// Fixed post-wake delay that models the CPU work a woken task would do
pub const SIMULATED_WORK: Duration = Duration::from_millis(250);

/// Well-known POSIX shared-memory name of the telemetry channel
pub const DEFAULT_CHANNEL_NAME: &str = "/stampede-telemetry";

/// Terminal sentinel for the telemetry `running` field: harness not running
pub const RUNNING_SENTINEL: i32 = -1;

/// Blocking-pool slack beyond the task count, so the release burst never
/// stalls on pool growth
pub const BLOCKING_HEADROOM: usize = 32;

/// Derive the default minimum worker count for a run: one worker per task,
/// capped. An operator-supplied value always wins over this.
pub fn default_min_workers(task_count: usize) -> usize {
    task_count.clamp(1, MIN_WORKERS_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_min_workers_caps() {
        assert_eq!(default_min_workers(3), 3);
        assert_eq!(default_min_workers(0), 1);
        assert_eq!(default_min_workers(50_000), MIN_WORKERS_CAP);
    }
}
