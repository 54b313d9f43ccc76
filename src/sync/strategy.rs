/*!
 * Wait Strategy
 * Per-run wait configuration: primitive kind, blocking vs suspending,
 * optional cancellation, and the per-task timeout
 */

use crate::core::errors::HarnessError;
use crate::core::{config::RunMode, DEFAULT_WAIT_TIMEOUT};
use std::time::Duration;

/// Which synchronization primitive every task in a run waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Bounded counting semaphore: zero initial permits, bound of one
    Semaphore,
    /// Manual-reset event: stays signaled once set
    ManualEvent,
    /// One-shot completion future: settable exactly once, suspending only
    Completion,
}

/// Immutable wait configuration shared by all tasks in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStrategy {
    pub kind: PrimitiveKind,
    /// Suspending waits park the task without occupying a worker thread;
    /// blocking waits hold their worker for the full wait duration.
    pub suspending: bool,
    /// Whether waits observe the process-wide cancellation token
    pub cancellable: bool,
    pub timeout: Duration,
}

impl WaitStrategy {
    pub fn new(
        kind: PrimitiveKind,
        suspending: bool,
        timeout: Duration,
    ) -> Result<Self, HarnessError> {
        let strategy = Self {
            kind,
            suspending,
            cancellable: false,
            timeout,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// The two sides of the original comparison: blocking semaphore waits
    /// for `sync` runs, suspending manual-reset events for `async` runs.
    pub fn for_mode(mode: RunMode, timeout: Duration) -> Self {
        match mode {
            RunMode::Blocking => Self {
                kind: PrimitiveKind::Semaphore,
                suspending: false,
                cancellable: false,
                timeout,
            },
            RunMode::Suspending => Self {
                kind: PrimitiveKind::ManualEvent,
                suspending: true,
                cancellable: true,
                timeout,
            },
        }
    }

    pub fn blocking_semaphore(timeout: Duration) -> Self {
        Self::for_mode(RunMode::Blocking, timeout)
    }

    pub fn suspending_event(timeout: Duration) -> Self {
        Self::for_mode(RunMode::Suspending, timeout)
    }

    pub fn suspending_completion(timeout: Duration) -> Self {
        Self {
            kind: PrimitiveKind::Completion,
            suspending: true,
            cancellable: false,
            timeout,
        }
    }

    pub fn with_cancellation(mut self) -> Self {
        self.cancellable = true;
        self
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.timeout.is_zero() {
            return Err(HarnessError::InvalidStrategy(
                "wait timeout must be positive".into(),
            ));
        }
        if self.kind == PrimitiveKind::Completion && !self.suspending {
            return Err(HarnessError::InvalidStrategy(
                "completion futures have no blocking wait".into(),
            ));
        }
        Ok(())
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::blocking_semaphore(DEFAULT_WAIT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_mapping() {
        let blocking = WaitStrategy::for_mode(RunMode::Blocking, Duration::from_secs(1));
        assert_eq!(blocking.kind, PrimitiveKind::Semaphore);
        assert!(!blocking.suspending);

        let suspending = WaitStrategy::for_mode(RunMode::Suspending, Duration::from_secs(1));
        assert_eq!(suspending.kind, PrimitiveKind::ManualEvent);
        assert!(suspending.suspending);
        assert!(suspending.cancellable);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = WaitStrategy::new(PrimitiveKind::Semaphore, false, Duration::ZERO);
        assert!(err.is_err());
    }

    #[test]
    fn test_blocking_completion_rejected() {
        let err = WaitStrategy::new(PrimitiveKind::Completion, false, Duration::from_secs(1));
        assert!(err.is_err());

        let ok = WaitStrategy::new(PrimitiveKind::Completion, true, Duration::from_secs(1));
        assert!(ok.is_ok());
    }
}
