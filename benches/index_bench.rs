//! Eviction index throughput.
//!
//! - close: tracking and refreshing paths from the dispatcher side
//! - expire: a sweep over a large index with nothing due (the common case)
//!   and with everything due
//!
//! Run with: cargo bench --bench index_bench

use std::path::PathBuf;
use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use pcpurge::EvictionIndex;

const ENTRIES: usize = 10_000;

fn paths(count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("/data/shard{:02}/file{:06}.bin", i % 64, i)))
        .collect()
}

fn populated(paths: &[PathBuf], now: Instant) -> EvictionIndex {
    let index = EvictionIndex::new();
    for path in paths {
        index.record_close(path, now).unwrap();
    }
    index
}

fn benchmark_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("close");
    let paths = paths(ENTRIES);
    group.throughput(Throughput::Elements(ENTRIES as u64));

    group.bench_function("track", |b| {
        b.iter_batched(
            EvictionIndex::new,
            |index| {
                let now = Instant::now();
                for path in &paths {
                    black_box(index.record_close(path, now).unwrap());
                }
            },
            BatchSize::LargeInput,
        )
    });

    let index = populated(&paths, Instant::now());
    group.bench_function("refresh", |b| {
        b.iter(|| {
            let now = Instant::now();
            for path in &paths {
                black_box(index.record_close(path, now).unwrap());
            }
        })
    });

    group.finish();
}

fn benchmark_expire(c: &mut Criterion) {
    let mut group = c.benchmark_group("expire");
    let paths = paths(ENTRIES);
    let ttl = Duration::from_secs(60);
    group.throughput(Throughput::Elements(ENTRIES as u64));

    let t0 = Instant::now();
    let idle = populated(&paths, t0);
    group.bench_function("nothing_due", |b| {
        b.iter(|| black_box(idle.expire(t0, ttl).unwrap()))
    });

    group.bench_function("all_due", |b| {
        b.iter_batched(
            || populated(&paths, t0),
            |index| black_box(index.expire(t0 + ttl, ttl).unwrap()),
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, benchmark_close, benchmark_expire);
criterion_main!(benches);
