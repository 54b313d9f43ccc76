/*!
 * Telemetry Channel
 *
 * Fixed-layout POSIX shared-memory region for cross-process occupancy
 * reporting. Single writer per process lifetime, any number of independent
 * reader processes, no coordination beyond the well-known name.
 *
 * Layout (8 bytes, little-endian):
 *
 * | offset | size | field    | meaning                                   |
 * |--------|------|----------|-------------------------------------------|
 * | 0      | 4    | running  | i32 worker count; -1 = terminal sentinel  |
 * | 4      | 1    | liveness | nonzero while the sampler loop is active  |
 *
 * Each field is republished every sampling interval with an independent
 * aligned store; readers may observe a torn (running, liveness) pair for
 * one interval and must treat every value as only eventually current.
 */

use crate::core::errors::TelemetryError;
use crate::core::types::RUNNING_SENTINEL;
use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use tracing::{debug, trace};

#[cfg(target_endian = "big")]
compile_error!("the telemetry frame layout is little-endian");

/// Region size; offsets below must stay within it
const FRAME_LEN: usize = 8;
const FRAME_LEN_NZ: NonZeroUsize = match NonZeroUsize::new(FRAME_LEN) {
    Some(len) => len,
    None => unreachable!(),
};
const RUNNING_OFFSET: usize = 0;
const LIVENESS_OFFSET: usize = 4;

/// One observed snapshot of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFrame {
    pub running: i32,
    pub live: bool,
}

impl TelemetryFrame {
    /// The terminal sentinel frame: producer has stopped
    pub const NOT_RUNNING: Self = Self {
        running: RUNNING_SENTINEL,
        live: false,
    };
}

/// A mapped view of the region. The atomics aliased into it are the only
/// access path; the mapping outlives every reference handed out because the
/// references never escape `&self` methods.
#[derive(Debug)]
struct ShmMap {
    base: NonNull<c_void>,
}

// One writer process, aligned atomic access only; the raw pointer is page
// aligned and owned for the lifetime of the map.
unsafe impl Send for ShmMap {}
unsafe impl Sync for ShmMap {}

impl ShmMap {
    fn running_cell(&self) -> &AtomicI32 {
        unsafe { &*(self.base.as_ptr().add(RUNNING_OFFSET) as *const AtomicI32) }
    }

    fn liveness_cell(&self) -> &AtomicU8 {
        unsafe { &*(self.base.as_ptr().add(LIVENESS_OFFSET) as *const AtomicU8) }
    }
}

impl Drop for ShmMap {
    fn drop(&mut self) {
        if let Err(e) = unsafe { munmap(self.base, FRAME_LEN) } {
            trace!(error = %e, "munmap failed on telemetry region");
        }
    }
}

fn unavailable(name: &str, err: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Unavailable {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

/// Write side: creates (or reuses) the named region and republishes frames.
/// Exactly one per process lifetime.
#[derive(Debug)]
pub struct TelemetryWriter {
    map: ShmMap,
    name: String,
}

impl TelemetryWriter {
    pub fn create(name: &str) -> Result<Self, TelemetryError> {
        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::from_bits_truncate(0o600),
        )
        .map_err(|e| unavailable(name, e))?;
        ftruncate(&fd, FRAME_LEN as i64).map_err(|e| unavailable(name, e))?;
        let base = unsafe {
            mmap(
                None,
                FRAME_LEN_NZ,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|e| unavailable(name, e))?;
        debug!(name, "telemetry channel created");
        Ok(Self {
            map: ShmMap { base },
            name: name.to_string(),
        })
    }

    /// Publish one frame: two independent aligned stores, no locking
    pub fn write_frame(&self, running: i32, live: bool) {
        self.map.running_cell().store(running, Ordering::Relaxed);
        self.map.liveness_cell().store(live as u8, Ordering::Relaxed);
    }

    /// Publish the terminal sentinel
    pub fn write_sentinel(&self) {
        self.write_frame(RUNNING_SENTINEL, false);
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Read side: opens an existing region read-only. Used by the monitor
/// process; any number may be open at once.
#[derive(Debug)]
pub struct TelemetryReader {
    map: ShmMap,
}

impl TelemetryReader {
    pub fn open(name: &str) -> Result<Self, TelemetryError> {
        let fd = shm_open(name, OFlag::O_RDONLY, Mode::empty())
            .map_err(|e| unavailable(name, e))?;
        let base = unsafe {
            mmap(
                None,
                FRAME_LEN_NZ,
                ProtFlags::PROT_READ,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|e| unavailable(name, e))?;
        Ok(Self {
            map: ShmMap { base },
        })
    }

    pub fn read_frame(&self) -> TelemetryFrame {
        TelemetryFrame {
            running: self.map.running_cell().load(Ordering::Relaxed),
            live: self.map.liveness_cell().load(Ordering::Relaxed) != 0,
        }
    }
}

/// Remove the named region. The writer deliberately does not unlink on drop:
/// the sentinel frame must stay readable by monitors that open late.
pub fn unlink(name: &str) -> Result<(), TelemetryError> {
    shm_unlink(name).map_err(|e| unavailable(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_name(tag: &str) -> String {
        format!("/stampede-test-{}-{}", tag, std::process::id())
    }

    #[test]
    fn test_round_trip() {
        let name = test_name("roundtrip");
        let writer = TelemetryWriter::create(&name).unwrap();
        writer.write_frame(42, true);

        let reader = TelemetryReader::open(&name).unwrap();
        assert_eq!(
            reader.read_frame(),
            TelemetryFrame {
                running: 42,
                live: true
            }
        );
        unlink(&name).unwrap();
    }

    #[test]
    fn test_sentinel_frame() {
        let name = test_name("sentinel");
        let writer = TelemetryWriter::create(&name).unwrap();
        writer.write_frame(7, true);
        writer.write_sentinel();

        let reader = TelemetryReader::open(&name).unwrap();
        assert_eq!(reader.read_frame(), TelemetryFrame::NOT_RUNNING);
        unlink(&name).unwrap();
    }

    #[test]
    fn test_open_missing_region_is_unavailable() {
        let err = TelemetryReader::open(&test_name("missing")).unwrap_err();
        assert!(matches!(err, TelemetryError::Unavailable { .. }));
    }

    #[test]
    fn test_region_survives_writer_drop() {
        let name = test_name("survives");
        {
            let writer = TelemetryWriter::create(&name).unwrap();
            writer.write_sentinel();
        }
        let reader = TelemetryReader::open(&name).unwrap();
        assert_eq!(reader.read_frame(), TelemetryFrame::NOT_RUNNING);
        unlink(&name).unwrap();
    }
}
