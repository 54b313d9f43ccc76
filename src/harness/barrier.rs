/*!
 * Release Barrier
 *
 * The rendezvous between the operator and the pending fan-out: the
 * orchestrator suspends until the trigger fires, then signals every
 * primitive as close to simultaneously as one loop allows.
 */

use crate::harness::types::ReleasePoint;
use crate::sync::SyncPrimitive;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Waits for the release trigger. Purely a rendezvous point; nothing about
/// the trigger wait is measured.
pub struct ReleaseBarrier {
    armed: oneshot::Receiver<()>,
}

/// Fires the barrier, from operator input or programmatically
pub struct ReleaseTrigger {
    fire: oneshot::Sender<()>,
}

/// Create a paired trigger and barrier for one run
pub fn trigger() -> (ReleaseTrigger, ReleaseBarrier) {
    let (fire, armed) = oneshot::channel();
    (ReleaseTrigger { fire }, ReleaseBarrier { armed })
}

impl ReleaseTrigger {
    pub fn fire(self) {
        let _ = self.fire.send(());
    }
}

impl ReleaseBarrier {
    /// Suspend until the trigger fires. A dropped trigger also releases, so
    /// shutdown paths cannot strand the orchestrator here.
    pub async fn await_trigger(self) {
        let _ = self.armed.await;
    }
}

/// Signal every primitive exactly once. The release timestamp is stamped
/// immediately before the first signal call, so the sequential O(count) cost
/// of this loop counts toward every task's measured latency; that cost grows
/// with contention and is part of what the benchmark exposes.
///
/// A disposed primitive is logged and skipped; its task resolves to
/// `TimedOut` when its wait expires.
pub fn release_all(primitives: &[Arc<SyncPrimitive>]) -> ReleasePoint {
    let released_at = Instant::now();
    let mut disposed = 0usize;
    for (index, primitive) in primitives.iter().enumerate() {
        if let Err(e) = primitive.signal() {
            disposed += 1;
            warn!(index, error = %e, "signal failed; task will time out");
        }
    }
    let signaled = primitives.len() - disposed;
    info!(
        signaled,
        disposed,
        loop_micros = released_at.elapsed().as_micros() as u64,
        "release fired"
    );
    ReleasePoint {
        released_at,
        signaled,
        disposed,
    }
}
