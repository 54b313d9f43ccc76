/*!
 * Monitor Read Contract
 * Threshold classification of observed occupancy, shared by the external
 * monitor binary and its tests
 */

use crate::telemetry::channel::TelemetryFrame;

const CALM_MAX: i32 = 16;
const ELEVATED_MAX: i32 = 99;
const HIGH_MAX: i32 = 999;

/// Rendered status of an observed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyLevel {
    /// Liveness down or sentinel observed
    NotRunning,
    Calm,
    Elevated,
    High,
    Critical,
}

impl OccupancyLevel {
    /// Liveness and the sentinel dominate the count; thresholds apply only
    /// to a live producer.
    pub fn classify(frame: TelemetryFrame) -> Self {
        if !frame.live || frame.running < 0 {
            Self::NotRunning
        } else if frame.running <= CALM_MAX {
            Self::Calm
        } else if frame.running <= ELEVATED_MAX {
            Self::Elevated
        } else if frame.running <= HIGH_MAX {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotRunning => "not running",
            Self::Calm => "calm",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Decides when an attached monitor should drop its mapping and reopen the
/// region. A mapping survives `shm_unlink`, so a harness that exits and
/// restarts under a fresh region would otherwise be read as stale memory
/// forever. Sustained not-running readings trigger a reattach.
#[derive(Debug)]
pub struct AttachPolicy {
    stale_polls: u32,
    threshold: u32,
}

impl AttachPolicy {
    pub const DEFAULT_THRESHOLD: u32 = 4;

    pub fn new(threshold: u32) -> Self {
        Self {
            stale_polls: 0,
            threshold,
        }
    }

    /// Record one reading; returns true when the mapping should be dropped
    /// and reopened.
    pub fn observe(&mut self, level: OccupancyLevel) -> bool {
        if level == OccupancyLevel::NotRunning {
            self.stale_polls += 1;
            if self.stale_polls >= self.threshold {
                self.stale_polls = 0;
                return true;
            }
        } else {
            self.stale_polls = 0;
        }
        false
    }
}

impl Default for AttachPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}
