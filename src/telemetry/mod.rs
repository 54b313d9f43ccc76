/*!
 * Telemetry Module
 * Cross-process occupancy reporting: shared-memory channel, scheduler
 * probe, background sampler, and the monitor's read contract
 */

pub mod channel;
pub mod monitor;
pub mod probe;
pub mod sampler;

// Re-export public API
pub use channel::{unlink, TelemetryFrame, TelemetryReader, TelemetryWriter};
pub use monitor::{AttachPolicy, OccupancyLevel};
pub use probe::{PoolProbe, PoolSnapshot, RuntimeProbe, WorkerGauge, WorkerGuard};
pub use sampler::{OccupancySampler, SamplerHandle};
