/*!
 * Occupancy Sampler
 *
 * Long-lived background loop publishing scheduler occupancy to the
 * telemetry channel. Runs on its own dedicated OS thread: observability
 * must keep working while the pool it observes is saturated.
 *
 * Resilience policy: a failed probe read or frame write is logged and the
 * loop continues; only cancellation stops it, and the terminal sentinel is
 * published exactly once on the way out.
 */

use crate::core::errors::TelemetryError;
use crate::telemetry::channel::TelemetryWriter;
use crate::telemetry::probe::PoolProbe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

/// Handle to the running sampler thread
pub struct SamplerHandle {
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SamplerHandle {
    /// Wait for the sampler to exit. Call after cancelling its token.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("sampler thread panicked; sentinel was still published");
            }
        }
    }
}

pub struct OccupancySampler;

impl OccupancySampler {
    /// Start sampling every `interval` until `cancel` fires. The sentinel
    /// lands within one interval of cancellation.
    pub fn start<P: PoolProbe>(
        probe: P,
        writer: TelemetryWriter,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<SamplerHandle, TelemetryError> {
        let thread = std::thread::Builder::new()
            .name("stampede-sampler".into())
            .spawn(move || sample_loop(probe, writer, interval, cancel))
            .map_err(|e| TelemetryError::SamplerStart(e.to_string()))?;
        Ok(SamplerHandle {
            thread: Some(thread),
        })
    }
}

/// Publishes the terminal sentinel when dropped, so the channel converges
/// to "not running" even if the loop unwinds.
struct SentinelGuard<'a> {
    writer: &'a TelemetryWriter,
}

impl Drop for SentinelGuard<'_> {
    fn drop(&mut self) {
        self.writer.write_sentinel();
        info!(channel = self.writer.name(), "telemetry sentinel published");
    }
}

fn sample_loop<P: PoolProbe>(
    probe: P,
    writer: TelemetryWriter,
    interval: Duration,
    cancel: CancellationToken,
) {
    let _sentinel = SentinelGuard { writer: &writer };

    // Liveness goes up before the first reading, matching what an early
    // reader should see: running, count not yet known
    writer.write_frame(0, true);
    info!(channel = writer.name(), interval_ms = interval.as_millis() as u64, "sampler started");

    while !cancel.is_cancelled() {
        match probe.sample() {
            Ok(snapshot) => {
                let running = snapshot.running();
                writer.write_frame(running, true);
                trace!(running, "occupancy published");
            }
            Err(e) => warn!(error = %e, "occupancy read failed; continuing"),
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ProbeError;
    use crate::telemetry::channel::{unlink, TelemetryFrame, TelemetryReader};
    use crate::telemetry::probe::PoolSnapshot;

    struct FixedProbe(usize);

    impl PoolProbe for FixedProbe {
        fn sample(&self) -> Result<PoolSnapshot, ProbeError> {
            Ok(PoolSnapshot {
                max_workers: self.0,
                idle_workers: 0,
            })
        }
    }

    struct FailingProbe;

    impl PoolProbe for FailingProbe {
        fn sample(&self) -> Result<PoolSnapshot, ProbeError> {
            Err(ProbeError::Introspection("injected".into()))
        }
    }

    fn test_name(tag: &str) -> String {
        format!("/stampede-sampler-{}-{}", tag, std::process::id())
    }

    #[test]
    fn test_publishes_readings_then_sentinel() {
        let name = test_name("happy");
        let writer = TelemetryWriter::create(&name).unwrap();
        let reader = TelemetryReader::open(&name).unwrap();
        let cancel = CancellationToken::new();

        let handle = OccupancySampler::start(
            FixedProbe(5),
            writer,
            Duration::from_millis(10),
            cancel.clone(),
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        let frame = reader.read_frame();
        assert_eq!(frame, TelemetryFrame { running: 5, live: true });

        cancel.cancel();
        handle.join();
        assert_eq!(reader.read_frame(), TelemetryFrame::NOT_RUNNING);
        unlink(&name).unwrap();
    }

    #[test]
    fn test_survives_probe_failures() {
        let name = test_name("failing");
        let writer = TelemetryWriter::create(&name).unwrap();
        let reader = TelemetryReader::open(&name).unwrap();
        let cancel = CancellationToken::new();

        let handle = OccupancySampler::start(
            FailingProbe,
            writer,
            Duration::from_millis(10),
            cancel.clone(),
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        // Still alive despite every read failing
        assert!(reader.read_frame().live);

        cancel.cancel();
        handle.join();
        assert_eq!(reader.read_frame(), TelemetryFrame::NOT_RUNNING);
        unlink(&name).unwrap();
    }
}
