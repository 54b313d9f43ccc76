/*!
 * Synchronization Primitives
 *
 * The waitable objects the harness parks its tasks on. A closed enum,
 * dispatched once at fan-out time: every task in a run waits on the same
 * variant, selected by its `WaitStrategy`.
 *
 * Each variant exposes a blocking face (`wait`, occupies the calling thread)
 * and a suspending face (`wait_async`, parks the task only). The completion
 * future is the exception: it is one-shot and suspending-only.
 */

use crate::core::errors::SignalError;
use crate::sync::strategy::{PrimitiveKind, WaitStrategy};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Terminal result of one task's wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The primitive was signaled before the timeout
    Signaled,
    /// The timeout elapsed first; a measured outcome, not a fault
    TimedOut,
    /// The wait was aborted by the process-wide cancellation token
    Canceled,
}

/// One waitable primitive instance, state unsignaled at construction
pub enum SyncPrimitive {
    Semaphore(SemaphoreGate),
    ManualEvent(EventGate),
    Completion(CompletionGate),
}

impl SyncPrimitive {
    /// Construct the primitive variant a strategy calls for
    pub fn for_strategy(strategy: &WaitStrategy) -> Self {
        match strategy.kind {
            PrimitiveKind::Semaphore => Self::Semaphore(SemaphoreGate::new()),
            PrimitiveKind::ManualEvent => Self::ManualEvent(EventGate::new()),
            PrimitiveKind::Completion => Self::Completion(CompletionGate::new()),
        }
    }

    /// Signal the primitive. Safe to call more than once: a second signal on
    /// a semaphore or event changes nothing observable; on a completion it
    /// reports `Disposed` (the one-shot sender is gone) and the caller logs.
    pub fn signal(&self) -> Result<(), SignalError> {
        match self {
            Self::Semaphore(gate) => {
                gate.release();
                Ok(())
            }
            Self::ManualEvent(gate) => {
                gate.set();
                Ok(())
            }
            Self::Completion(gate) => gate.complete(),
        }
    }

    /// Blocking wait: occupies the calling worker thread until signaled or
    /// the timeout elapses.
    pub fn wait(&self, timeout: Duration) -> WaitOutcome {
        match self {
            Self::Semaphore(gate) => gate.acquire(timeout),
            Self::ManualEvent(gate) => gate.wait(timeout),
            Self::Completion(_) => {
                // Ruled out by strategy validation
                error!("blocking wait on a completion future");
                WaitOutcome::TimedOut
            }
        }
    }

    /// Suspending wait: parks the task without occupying a worker thread.
    /// With a token, cancellation wins over both signal and timeout.
    pub async fn wait_async(
        &self,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> WaitOutcome {
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => WaitOutcome::Canceled,
                    outcome = self.wait_async_inner(timeout) => outcome,
                }
            }
            None => self.wait_async_inner(timeout).await,
        }
    }

    async fn wait_async_inner(&self, timeout: Duration) -> WaitOutcome {
        match self {
            Self::Semaphore(gate) => gate.acquire_async(timeout).await,
            Self::ManualEvent(gate) => gate.wait_async(timeout).await,
            Self::Completion(gate) => gate.wait_async(timeout).await,
        }
    }
}

/// Counting semaphore with zero initial permits and a bound of one.
/// A single permit count serves both faces; the `Notify` carries async
/// wakeups, the `Condvar` blocking ones.
pub struct SemaphoreGate {
    permits: Mutex<u32>,
    released: Condvar,
    notify: Notify,
}

/// Permit bound. One release per waiter in this harness; the bound makes a
/// duplicate release invisible.
const SEMAPHORE_BOUND: u32 = 1;

impl SemaphoreGate {
    pub fn new() -> Self {
        Self {
            permits: Mutex::new(0),
            released: Condvar::new(),
            notify: Notify::new(),
        }
    }

    pub fn release(&self) {
        {
            let mut permits = self.permits.lock();
            if *permits < SEMAPHORE_BOUND {
                *permits += 1;
            }
        }
        self.released.notify_one();
        self.notify.notify_one();
    }

    pub fn acquire(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return WaitOutcome::Signaled;
            }
            if self.released.wait_until(&mut permits, deadline).timed_out() {
                // A release can land right at the deadline
                if *permits > 0 {
                    *permits -= 1;
                    return WaitOutcome::Signaled;
                }
                return WaitOutcome::TimedOut;
            }
        }
    }

    pub async fn acquire_async(&self, timeout: Duration) -> WaitOutcome {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut permits = self.permits.lock();
                if *permits > 0 {
                    *permits -= 1;
                    return WaitOutcome::Signaled;
                }
            }
            // notify_one stores a permit when no waiter is registered, so a
            // release between the check above and this await is not lost
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                let mut permits = self.permits.lock();
                if *permits > 0 {
                    *permits -= 1;
                    return WaitOutcome::Signaled;
                }
                return WaitOutcome::TimedOut;
            }
        }
    }
}

impl Default for SemaphoreGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Manual-reset event: once set it stays set, and late waiters pass straight
/// through. The flag under the mutex is authoritative; the watch channel
/// mirrors it for suspending waiters and is only written while the mutex is
/// held.
pub struct EventGate {
    set: Mutex<bool>,
    signaled: Condvar,
    mirror: watch::Sender<bool>,
}

impl EventGate {
    pub fn new() -> Self {
        let (mirror, _) = watch::channel(false);
        Self {
            set: Mutex::new(false),
            signaled: Condvar::new(),
            mirror,
        }
    }

    pub fn set(&self) {
        let mut set = self.set.lock();
        if !*set {
            *set = true;
            self.signaled.notify_all();
            self.mirror.send_replace(true);
        }
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    pub fn wait(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock();
        while !*set {
            if self.signaled.wait_until(&mut set, deadline).timed_out() {
                return if *set {
                    WaitOutcome::Signaled
                } else {
                    WaitOutcome::TimedOut
                };
            }
        }
        WaitOutcome::Signaled
    }

    pub async fn wait_async(&self, timeout: Duration) -> WaitOutcome {
        let mut rx = self.mirror.subscribe();
        // wait_for inspects the current value first, so set-before-wait
        // completes immediately. The awaited result is bound before the
        // match so the borrow of rx ends here.
        let result = tokio::time::timeout(timeout, rx.wait_for(|set| *set)).await;
        match result {
            Ok(Ok(_)) => WaitOutcome::Signaled,
            // The sender lives inside the gate, so a closed channel only
            // happens after the gate itself is gone
            Ok(Err(_)) | Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Default for EventGate {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot completion future: settable exactly once, one suspending waiter.
pub struct CompletionGate {
    tx: Mutex<Option<oneshot::Sender<()>>>,
    rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl CompletionGate {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn complete(&self) -> Result<(), SignalError> {
        match self.tx.lock().take() {
            // A send error means the waiter already timed out and dropped
            // its receiver; the outcome is theirs to keep
            Some(tx) => {
                let _ = tx.send(());
                Ok(())
            }
            None => Err(SignalError::Disposed),
        }
    }

    pub async fn wait_async(&self, timeout: Duration) -> WaitOutcome {
        let rx = match self.rx.lock().take() {
            Some(rx) => rx,
            None => {
                error!("completion future waited on twice");
                return WaitOutcome::TimedOut;
            }
        };
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(())) => WaitOutcome::Signaled,
            // Sender dropped unsignaled: the primitive was disposed early,
            // which a task reports as a timeout
            Ok(Err(_)) | Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new()
    }
}
