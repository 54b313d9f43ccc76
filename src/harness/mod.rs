/*!
 * Harness Module
 * Run orchestration: pool sizing, task fan-out, barrier release, and the
 * latency drain
 */

pub mod barrier;
pub mod collector;
pub mod fanout;
pub mod pool;
pub mod types;

// Re-export public API
pub use barrier::{release_all, trigger, ReleaseBarrier, ReleaseTrigger};
pub use collector::LatencyCollector;
pub use fanout::{FanoutHandle, TaskFanout};
pub use pool::PoolSizer;
pub use types::{DrainOutcome, ReleasePoint, RunReport, RunResult, TaskRecord};
