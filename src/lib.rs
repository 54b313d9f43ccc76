/*!
 * Stampede Library
 * Thread-pool contention harness and cross-process occupancy telemetry
 */

pub mod core;
pub mod harness;
pub mod sync;
pub mod telemetry;
pub mod tracer;

// Re-exports
pub use self::core::config::{HarnessConfig, RunMode};
pub use self::core::errors::{Error, HarnessError, ProbeError, Result, SignalError, TelemetryError};
pub use harness::{
    release_all, LatencyCollector, PoolSizer, ReleasePoint, RunReport, RunResult, TaskFanout,
};
pub use sync::{PrimitiveKind, SyncPrimitive, WaitOutcome, WaitStrategy};
pub use telemetry::{
    OccupancyLevel, OccupancySampler, RuntimeProbe, TelemetryFrame, TelemetryReader,
    TelemetryWriter, WorkerGauge,
};
pub use tracer::init_tracing;
