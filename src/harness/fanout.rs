/*!
 * Task Fan-out
 *
 * Creates N independent units of work, each bound to one primitive instance,
 * and submits them to the scheduler. Every task reports its timing record
 * over a channel to the single collecting consumer; nothing is aggregated
 * through shared counters.
 */

use crate::core::errors::HarnessError;
use crate::core::types::{TaskIndex, SIMULATED_WORK};
use crate::harness::types::TaskRecord;
use crate::sync::{SyncPrimitive, WaitOutcome, WaitStrategy};
use crate::telemetry::probe::WorkerGauge;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Fan-out driver for one run. All tasks share the run's strategy, the
/// process-wide cancellation token, and the occupancy gauge blocking tasks
/// report through.
pub struct TaskFanout {
    strategy: WaitStrategy,
    cancel: CancellationToken,
    gauge: WorkerGauge,
    events_tx: flume::Sender<TaskRecord>,
}

/// Pending fan-out: the primitive collection the release barrier will signal
pub struct FanoutHandle {
    primitives: Vec<Arc<SyncPrimitive>>,
}

impl FanoutHandle {
    pub fn primitives(&self) -> &[Arc<SyncPrimitive>] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

impl TaskFanout {
    /// Create a fan-out and the completion-event channel its tasks report
    /// on. The receiver goes to the `LatencyCollector`.
    pub fn new(
        strategy: WaitStrategy,
        cancel: CancellationToken,
        gauge: WorkerGauge,
    ) -> Result<(Self, flume::Receiver<TaskRecord>), HarnessError> {
        strategy.validate()?;
        let (events_tx, events_rx) = flume::unbounded();
        Ok((
            Self {
                strategy,
                cancel,
                gauge,
                events_tx,
            },
            events_rx,
        ))
    }

    /// Spawn `count` tasks, each holding one unsignaled primitive. Must be
    /// called from within the runtime the run was sized for.
    ///
    /// Submission mode follows the strategy: suspending waits become pool
    /// tasks, blocking waits go to the blocking pool, and `dedicated` routes
    /// each blocking wait to its own OS thread instead so it can never queue
    /// behind other work (memory traded for latency determinism).
    pub fn spawn(&self, count: usize, dedicated: bool) -> Result<FanoutHandle, HarnessError> {
        if dedicated && self.strategy.suspending {
            return Err(HarnessError::InvalidStrategy(
                "dedicated-thread mode applies to blocking waits only".into(),
            ));
        }

        let mut primitives = Vec::with_capacity(count);
        for index in 0..count {
            let primitive = Arc::new(SyncPrimitive::for_strategy(&self.strategy));
            primitives.push(Arc::clone(&primitive));
            self.submit(index, primitive, dedicated)?;
        }

        info!(
            count,
            suspending = self.strategy.suspending,
            dedicated,
            "fan-out submitted"
        );
        Ok(FanoutHandle { primitives })
    }

    fn submit(
        &self,
        index: TaskIndex,
        primitive: Arc<SyncPrimitive>,
        dedicated: bool,
    ) -> Result<(), HarnessError> {
        let strategy = self.strategy;
        let cancel = self.cancel.clone();
        let tx = self.events_tx.clone();
        let submitted_at = Instant::now();

        if strategy.suspending {
            tokio::spawn(run_suspending_task(
                index,
                primitive,
                strategy,
                submitted_at,
                cancel,
                tx,
            ));
        } else if dedicated {
            // Dedicated threads are not pool threads and stay off the gauge
            std::thread::Builder::new()
                .name(format!("stampede-task-{index}"))
                .spawn(move || {
                    run_blocking_task(index, primitive, strategy, submitted_at, cancel, tx)
                })
                .map_err(|e| HarnessError::SpawnFailed {
                    index,
                    reason: e.to_string(),
                })?;
        } else {
            let gauge = self.gauge.clone();
            tokio::task::spawn_blocking(move || {
                let _occupied = gauge.occupy();
                run_blocking_task(index, primitive, strategy, submitted_at, cancel, tx)
            });
        }
        Ok(())
    }
}

fn run_blocking_task(
    index: TaskIndex,
    primitive: Arc<SyncPrimitive>,
    strategy: WaitStrategy,
    submitted_at: Instant,
    cancel: CancellationToken,
    tx: flume::Sender<TaskRecord>,
) {
    let started_at = Instant::now();
    let outcome = if strategy.cancellable && cancel.is_cancelled() {
        WaitOutcome::Canceled
    } else {
        primitive.wait(strategy.timeout)
    };
    let woke_at = Instant::now();
    if outcome != WaitOutcome::Canceled {
        std::thread::sleep(SIMULATED_WORK);
    }
    finish(index, submitted_at, started_at, woke_at, outcome, &tx);
}

async fn run_suspending_task(
    index: TaskIndex,
    primitive: Arc<SyncPrimitive>,
    strategy: WaitStrategy,
    submitted_at: Instant,
    cancel: CancellationToken,
    tx: flume::Sender<TaskRecord>,
) {
    let started_at = Instant::now();
    let token = strategy.cancellable.then_some(&cancel);
    let outcome = primitive.wait_async(strategy.timeout, token).await;
    let woke_at = Instant::now();
    if outcome != WaitOutcome::Canceled {
        tokio::time::sleep(SIMULATED_WORK).await;
    }
    finish(index, submitted_at, started_at, woke_at, outcome, &tx);
}

fn finish(
    index: TaskIndex,
    submitted_at: Instant,
    started_at: Instant,
    woke_at: Instant,
    outcome: WaitOutcome,
    tx: &flume::Sender<TaskRecord>,
) {
    let record = TaskRecord {
        index,
        submitted_at,
        started_at,
        woke_at,
        completed_at: Instant::now(),
        outcome,
    };
    debug!(index, outcome = ?outcome, "task finished");
    // The collector may already have given up (drain timeout); its absence
    // is not this task's problem
    let _ = tx.send(record);
}
