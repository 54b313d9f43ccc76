/*!
 * Telemetry Integration Tests
 * Shared-memory channel lifecycle as the monitor process observes it
 */

use pretty_assertions::assert_eq;
use stampede::telemetry::{
    unlink, OccupancyLevel, OccupancySampler, PoolProbe, PoolSnapshot, TelemetryFrame,
    TelemetryReader, TelemetryWriter,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn test_name(tag: &str) -> String {
    format!("/stampede-it-{}-{}", tag, std::process::id())
}

struct FixedProbe(usize);

impl PoolProbe for FixedProbe {
    fn sample(&self) -> Result<PoolSnapshot, stampede::core::errors::ProbeError> {
        Ok(PoolSnapshot {
            max_workers: self.0,
            idle_workers: 0,
        })
    }
}

#[test]
fn test_reader_observes_published_frames() {
    let name = test_name("frames");
    let writer = TelemetryWriter::create(&name).unwrap();
    let reader = TelemetryReader::open(&name).unwrap();

    writer.write_frame(42, true);
    let frame = reader.read_frame();
    assert_eq!(
        frame,
        TelemetryFrame {
            running: 42,
            live: true
        }
    );
    assert_eq!(OccupancyLevel::classify(frame), OccupancyLevel::Elevated);
    unlink(&name).unwrap();
}

#[test]
fn test_sampler_shutdown_converges_to_not_running() {
    let name = test_name("shutdown");
    let writer = TelemetryWriter::create(&name).unwrap();
    let reader = TelemetryReader::open(&name).unwrap();
    let cancel = CancellationToken::new();

    let handle = OccupancySampler::start(
        FixedProbe(120),
        writer,
        Duration::from_millis(10),
        cancel.clone(),
    )
    .unwrap();

    std::thread::sleep(Duration::from_millis(50));
    let frame = reader.read_frame();
    assert!(frame.live);
    assert_eq!(OccupancyLevel::classify(frame), OccupancyLevel::High);

    // After cancellation the sentinel must land and stay
    cancel.cancel();
    handle.join();
    let frame = reader.read_frame();
    assert_eq!(frame, TelemetryFrame::NOT_RUNNING);
    assert_eq!(OccupancyLevel::classify(frame), OccupancyLevel::NotRunning);
    unlink(&name).unwrap();
}

#[test]
fn test_monitor_attach_before_producer_fails_cleanly() {
    // The monitor polls for the region; before the producer creates it the
    // open must fail without side effects
    let name = test_name("absent");
    assert!(TelemetryReader::open(&name).is_err());

    let writer = TelemetryWriter::create(&name).unwrap();
    writer.write_frame(3, true);
    let reader = TelemetryReader::open(&name).unwrap();
    assert_eq!(OccupancyLevel::classify(reader.read_frame()), OccupancyLevel::Calm);
    unlink(&name).unwrap();
}

#[test]
fn test_reopen_observes_recreated_region() {
    // A mapping survives unlink, so an attached reader keeps seeing the old
    // region after the producer restarts; only reopening picks up the new one
    let name = test_name("recreated");
    let first_writer = TelemetryWriter::create(&name).unwrap();
    first_writer.write_sentinel();
    let stale_reader = TelemetryReader::open(&name).unwrap();
    unlink(&name).unwrap();
    drop(first_writer);

    let second_writer = TelemetryWriter::create(&name).unwrap();
    second_writer.write_frame(9, true);

    assert_eq!(stale_reader.read_frame(), TelemetryFrame::NOT_RUNNING);
    let fresh_reader = TelemetryReader::open(&name).unwrap();
    assert_eq!(
        fresh_reader.read_frame(),
        TelemetryFrame {
            running: 9,
            live: true
        }
    );
    unlink(&name).unwrap();
}

#[test]
fn test_sentinel_outlives_writer() {
    // A late monitor must still read "not running" after the producer exits
    let name = test_name("late");
    {
        let writer = TelemetryWriter::create(&name).unwrap();
        writer.write_frame(500, true);
        writer.write_sentinel();
    }
    let reader = TelemetryReader::open(&name).unwrap();
    assert_eq!(reader.read_frame(), TelemetryFrame::NOT_RUNNING);
    unlink(&name).unwrap();
}
