/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 *
 * Timeouts and cancellation are *measured outcomes* in this harness
 * (`WaitOutcome`, `DrainOutcome`), not errors. The error types below cover
 * the conditions that are actual faults: failing to size or build the pool,
 * failing to spawn the fan-out, scheduler introspection failures, and an
 * unopenable telemetry channel.
 */

use miette::Diagnostic;
use thiserror::Error;

/// Harness orchestration errors. Pool build and spawn failures are the only
/// process-fatal conditions; everything else is surfaced in the run result.
#[derive(Error, Debug, Diagnostic)]
pub enum HarnessError {
    #[error("Failed to build worker pool: {0}")]
    #[diagnostic(
        code(harness::pool_build_failed),
        help("Check worker thread limits and available system resources.")
    )]
    PoolBuild(String),

    #[error("Failed to spawn task {index}: {reason}")]
    #[diagnostic(
        code(harness::spawn_failed),
        help("The system may be out of threads or memory. Lower the task count.")
    )]
    SpawnFailed { index: usize, reason: String },

    #[error("Invalid wait strategy: {0}")]
    #[diagnostic(
        code(harness::invalid_strategy),
        help("Completion futures only support suspending waits, and timeouts must be positive.")
    )]
    InvalidStrategy(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(harness::configuration),
        help("Review command-line arguments and STAMPEDE_* environment variables.")
    )]
    Configuration(String),
}

/// Signal delivery errors. A disposed primitive is logged by the release
/// barrier and the affected task resolves to `TimedOut` on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SignalError {
    #[error("Primitive already disposed or consumed")]
    #[diagnostic(
        code(sync::primitive_disposed),
        help("The one-shot completion was already taken; the waiter will time out.")
    )]
    Disposed,
}

/// Scheduler introspection errors, surfaced by `PoolProbe` implementations.
/// The sampler logs these and keeps its loop alive.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProbeError {
    #[error("Scheduler introspection failed: {0}")]
    #[diagnostic(
        code(telemetry::probe_read_failed),
        help("Transient failure; the sampler continues on the next interval.")
    )]
    Introspection(String),
}

/// Telemetry channel errors. An unavailable channel is fatal to telemetry
/// only; benchmarking continues without it.
#[derive(Error, Debug, Diagnostic)]
pub enum TelemetryError {
    #[error("Telemetry channel '{name}' unavailable: {reason}")]
    #[diagnostic(
        code(telemetry::channel_unavailable),
        help("Check /dev/shm permissions and that the name starts with '/'.")
    )]
    Unavailable { name: String, reason: String },

    #[error("Failed to start occupancy sampler: {0}")]
    #[diagnostic(
        code(telemetry::sampler_start_failed),
        help("Spawning the dedicated sampler thread failed.")
    )]
    SamplerStart(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Probe(#[from] ProbeError),
}

/// Unified harness error type
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Harness(#[from] HarnessError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_error_display() {
        let err = HarnessError::PoolBuild("no threads".into());
        assert_eq!(err.to_string(), "Failed to build worker pool: no threads");
    }

    #[test]
    fn test_error_unifies_domains() {
        let err: Error = HarnessError::Configuration("bad mode".into()).into();
        assert!(matches!(err, Error::Harness(_)));

        let err: Error = TelemetryError::SamplerStart("spawn failed".into()).into();
        assert!(matches!(err, Error::Telemetry(_)));
    }

    #[test]
    fn test_probe_error_converts() {
        let err: TelemetryError = ProbeError::Introspection("metrics gone".into()).into();
        assert!(matches!(err, TelemetryError::Probe(_)));
    }
}
