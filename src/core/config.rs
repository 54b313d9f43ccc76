/*!
 * Harness Configuration
 * Run parameters from positional arguments and STAMPEDE_* environment variables
 */

use crate::core::errors::HarnessError;
use crate::core::types::{
    default_min_workers, DEFAULT_CHANNEL_NAME, DEFAULT_SAMPLE_INTERVAL, DEFAULT_TASK_COUNT,
    DEFAULT_WAIT_TIMEOUT, DRAIN_MARGIN, SIMULATED_WORK,
};
use std::time::Duration;

/// Which side of the central comparison a run exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Blocking waits: each pending task occupies one pool worker thread
    Blocking,
    /// Suspending waits: pending tasks park without occupying a worker
    Suspending,
}

/// Immutable configuration for one harness process
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Number of tasks in the fan-out
    pub task_count: usize,
    /// Minimum worker threads configured on the pool before the run
    pub min_workers: usize,
    pub mode: RunMode,
    /// Per-task wait timeout
    pub wait_timeout: Duration,
    /// Global drain timeout
    pub drain_timeout: Duration,
    /// Occupancy sampling interval
    pub sample_interval: Duration,
    /// POSIX shared-memory name of the telemetry channel
    pub channel_name: String,
    /// After the pool run, repeat the blocking fan-out on dedicated threads
    /// and report both drain times
    pub compare_dedicated: bool,
    /// Release immediately instead of gating on operator input
    pub auto_release: bool,
}

impl HarnessConfig {
    /// Build a configuration from positional arguments
    /// (`stampede [min_workers] [sync|async]`) and the process environment.
    pub fn from_env_args<I>(args: I) -> Result<Self, HarnessError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let task_count = env_usize("STAMPEDE_TASKS", DEFAULT_TASK_COUNT)?;

        let min_workers = match args.first() {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                HarnessError::Configuration(format!(
                    "minimum worker count must be an integer, got '{raw}'"
                ))
            })?,
            None => default_min_workers(task_count),
        };
        if min_workers == 0 {
            return Err(HarnessError::Configuration(
                "minimum worker count must be at least 1".into(),
            ));
        }

        let mode = match args.get(1).map(String::as_str) {
            None | Some("sync") => RunMode::Blocking,
            Some("async") => RunMode::Suspending,
            Some(other) => {
                return Err(HarnessError::Configuration(format!(
                    "unknown mode '{other}', expected 'sync' or 'async'"
                )))
            }
        };

        let wait_timeout = positive_ms(
            "STAMPEDE_TIMEOUT_MS",
            env_u64("STAMPEDE_TIMEOUT_MS", DEFAULT_WAIT_TIMEOUT.as_millis() as u64)?,
        )?;

        let sample_interval = positive_ms(
            "STAMPEDE_SAMPLE_MS",
            env_u64("STAMPEDE_SAMPLE_MS", DEFAULT_SAMPLE_INTERVAL.as_millis() as u64)?,
        )?;

        Ok(Self {
            task_count,
            min_workers,
            mode,
            wait_timeout,
            drain_timeout: wait_timeout + SIMULATED_WORK + DRAIN_MARGIN,
            sample_interval,
            channel_name: std::env::var("STAMPEDE_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_CHANNEL_NAME.to_string()),
            compare_dedicated: env_flag("STAMPEDE_DEDICATED"),
            auto_release: env_flag("STAMPEDE_AUTO_RELEASE"),
        })
    }
}

fn env_usize(key: &str, default: usize) -> Result<usize, HarnessError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<usize>().map_err(|_| {
            HarnessError::Configuration(format!("{key} must be an integer, got '{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, HarnessError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<u64>().map_err(|_| {
            HarnessError::Configuration(format!("{key} must be an integer, got '{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}

/// Timeouts and intervals must be positive: a zero wait timeout disables
/// the wait and a zero sampling interval busy-spins the sampler thread.
fn positive_ms(key: &str, ms: u64) -> Result<Duration, HarnessError> {
    if ms == 0 {
        return Err(HarnessError::Configuration(format!(
            "{key} must be positive"
        )));
    }
    Ok(Duration::from_millis(ms))
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}
