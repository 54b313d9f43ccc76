/*!
 * Release Barrier Benchmarks
 *
 * Measure the sequential cost of signaling a full primitive collection; this
 * loop sits inside every task's measured wake latency
 */

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use stampede::harness::release_all;
use stampede::sync::{SyncPrimitive, WaitStrategy};
use std::sync::Arc;
use std::time::Duration;

fn primitives(strategy: &WaitStrategy, count: usize) -> Vec<Arc<SyncPrimitive>> {
    (0..count)
        .map(|_| Arc::new(SyncPrimitive::for_strategy(strategy)))
        .collect()
}

fn bench_release_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("release_loop");

    for count in [100usize, 1_000, 10_000] {
        let strategy = WaitStrategy::blocking_semaphore(Duration::from_secs(1));
        group.bench_with_input(
            BenchmarkId::new("semaphore", count),
            &count,
            |b, &count| {
                b.iter_batched(
                    || primitives(&strategy, count),
                    |prims| black_box(release_all(&prims)),
                    BatchSize::SmallInput,
                );
            },
        );

        let strategy = WaitStrategy::suspending_event(Duration::from_secs(1));
        group.bench_with_input(
            BenchmarkId::new("manual_event", count),
            &count,
            |b, &count| {
                b.iter_batched(
                    || primitives(&strategy, count),
                    |prims| black_box(release_all(&prims)),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_release_loop);
criterion_main!(benches);
