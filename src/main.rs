/*!
 * Stampede - Main Entry Point
 *
 * Thread-pool contention benchmark:
 * - Fans out N tasks that all wait on per-task primitives
 * - Releases them at a single barrier point
 * - Measures wake latency and drain time
 * - Publishes pool occupancy over shared memory for external monitors
 */

use serde::Serialize;
use stampede::core::config::{HarnessConfig, RunMode};
use stampede::core::errors::Error;
use stampede::harness::{
    release_all, trigger, LatencyCollector, PoolSizer, ReleasePoint, RunReport, RunResult,
    TaskFanout,
};
use stampede::sync::WaitStrategy;
use stampede::telemetry::{
    OccupancySampler, RuntimeProbe, SamplerHandle, TelemetryWriter, WorkerGauge,
};
use stampede::tracer::init_tracing;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Final summary printed as JSON on stdout
#[derive(Debug, Serialize)]
struct BenchmarkReport {
    mode: &'static str,
    min_workers: usize,
    pool: RunReport,
    /// Present only for the dedicated-thread comparison run
    #[serde(skip_serializing_if = "Option::is_none")]
    dedicated: Option<RunReport>,
}

fn main() -> miette::Result<()> {
    // Initialize structured tracing
    init_tracing();

    let config = HarnessConfig::from_env_args(std::env::args().skip(1))?;
    let strategy = WaitStrategy::for_mode(config.mode, config.wait_timeout);

    info!(
        tasks = config.task_count,
        min_workers = config.min_workers,
        mode = ?config.mode,
        "stampede starting"
    );

    // The pool under test is the runtime itself, sized before any task runs
    let runtime = PoolSizer::for_run(&config, &strategy).build()?;

    let report = runtime.block_on(run(&config, strategy));

    // An interrupted run leaves uncancellable blocking waits and the stdin
    // gate behind; bound the shutdown instead of waiting out their timeouts
    runtime.shutdown_timeout(Duration::from_secs(1));

    let report = report?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "could not serialize report"),
    }
    Ok(())
}

async fn run(config: &HarnessConfig, strategy: WaitStrategy) -> Result<BenchmarkReport, Error> {
    let cancel = CancellationToken::new();

    // Ctrl-C cancels the run; tasks and the drain observe the same token
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling run");
            ctrl_c_cancel.cancel();
        }
    });

    // One gauge spans the sampler and every fan-out of the run
    let gauge = WorkerGauge::new();
    let sampler = start_sampler(config, &gauge, &cancel);

    let pool_result = execute_run(config, strategy, false, &gauge, &cancel).await?;
    let pool_report = pool_result.report();

    // Optional second pass: same blocking fan-out, each wait on its own
    // dedicated OS thread instead of the pool
    let dedicated = if config.compare_dedicated && config.mode == RunMode::Blocking {
        info!("repeating fan-out on dedicated threads");
        let result = execute_run(config, strategy, true, &gauge, &cancel).await?;
        Some(result.report())
    } else {
        None
    };

    cancel.cancel();
    if let Some(handle) = sampler {
        let _ = tokio::task::spawn_blocking(move || handle.join()).await;
    }

    Ok(BenchmarkReport {
        mode: match config.mode {
            RunMode::Blocking => "blocking",
            RunMode::Suspending => "suspending",
        },
        min_workers: config.min_workers,
        pool: pool_report,
        dedicated,
    })
}

/// Telemetry is best-effort: a run without an observable channel still
/// produces its report.
fn start_sampler(
    config: &HarnessConfig,
    gauge: &WorkerGauge,
    cancel: &CancellationToken,
) -> Option<SamplerHandle> {
    let writer = match TelemetryWriter::create(&config.channel_name) {
        Ok(writer) => writer,
        Err(e) => {
            warn!(error = %e, "telemetry channel unavailable, continuing without it");
            return None;
        }
    };
    let probe = RuntimeProbe::new(&Handle::current(), gauge.clone());
    match OccupancySampler::start(probe, writer, config.sample_interval, cancel.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "sampler failed to start, continuing without it");
            None
        }
    }
}

async fn execute_run(
    config: &HarnessConfig,
    strategy: WaitStrategy,
    dedicated: bool,
    gauge: &WorkerGauge,
    cancel: &CancellationToken,
) -> Result<RunResult, Error> {
    let (fanout, events) = TaskFanout::new(strategy, cancel.clone(), gauge.clone())?;
    let handle = fanout.spawn(config.task_count, dedicated)?;

    // The comparison pass releases immediately; the primary run gates on the
    // operator unless auto-release was requested
    let release = if config.auto_release || dedicated {
        release_all(handle.primitives())
    } else {
        let (trig, barrier) = trigger();
        tokio::task::spawn_blocking(move || {
            info!("press Enter to release all tasks");
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            trig.fire();
        });

        tokio::select! {
            _ = barrier.await_trigger() => release_all(handle.primitives()),
            _ = cancel.cancelled() => {
                // Canceled before release: nothing is signaled, tasks resolve
                // through cancellation or their own timeouts
                warn!("canceled before release");
                ReleasePoint::immediate()
            }
        }
    };

    let collector = LatencyCollector::new(events, config.task_count);
    Ok(collector.drain(release, config.drain_timeout, cancel).await)
}
