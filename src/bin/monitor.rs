/*!
 * Stampede Monitor - External Observer
 *
 * Independent process that polls the shared-memory telemetry channel and
 * prints occupancy transitions. Tolerates the channel appearing after it
 * starts and the producer dying at any point.
 */

use stampede::core::types::{DEFAULT_CHANNEL_NAME, DEFAULT_SAMPLE_INTERVAL};
use stampede::telemetry::{AttachPolicy, OccupancyLevel, TelemetryFrame, TelemetryReader};
use stampede::tracer::init_tracing;
use std::time::Duration;
use tracing::{debug, info};

fn main() {
    init_tracing();

    let name = std::env::var("STAMPEDE_CHANNEL")
        .unwrap_or_else(|_| DEFAULT_CHANNEL_NAME.to_string());
    let interval = std::env::var("STAMPEDE_SAMPLE_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_SAMPLE_INTERVAL);

    info!(channel = %name, interval_ms = interval.as_millis() as u64, "monitor started");

    let mut reader: Option<TelemetryReader> = None;
    let mut last: Option<TelemetryFrame> = None;
    let mut policy = AttachPolicy::default();

    loop {
        // Attach on every poll until the channel exists; the harness may
        // start after us
        if reader.is_none() {
            match TelemetryReader::open(&name) {
                Ok(r) => {
                    info!(channel = %name, "attached to telemetry channel");
                    reader = Some(r);
                }
                Err(e) => debug!(error = %e, "channel not yet available"),
            }
        }

        let frame = reader
            .as_ref()
            .map(|r| r.read_frame())
            .unwrap_or(TelemetryFrame::NOT_RUNNING);
        let level = OccupancyLevel::classify(frame);

        if last != Some(frame) {
            match level {
                OccupancyLevel::NotRunning => println!("[{}] producer not running", level.label()),
                _ => println!("[{}] {} worker threads busy", level.label(), frame.running),
            }
            last = Some(frame);
        }

        // A sustained silent region may be an unlinked mapping left over
        // from an exited harness; drop it so a recreated region is picked up
        if reader.is_some() && policy.observe(level) {
            debug!(channel = %name, "detaching from silent region");
            reader = None;
        }

        std::thread::sleep(interval);
    }
}
