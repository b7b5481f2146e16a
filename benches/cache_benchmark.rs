//! Performance benchmarks for the job cache
//!
//! This benchmark suite measures:
//! - Snapshot construction across collection sizes
//! - Id and number lookups, hit and miss
//! - Substring search over the whole snapshot
//! - A full refresh pass against an in-memory source
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use acculynx::{CacheConfig, InMemoryJobSource, Job, JobCache, JobSnapshot};
use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

// ============================================================================
// Benchmark Test Fixtures
// ============================================================================

fn jobs(count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| {
            Job::new(format!("7c9e6679-{:08}", i))
                .with_number(format!("BNX-{}", 1000 + i))
                .with_name(format!("Residence {} Roof Replacement", i))
        })
        .collect()
}

// ============================================================================
// Snapshot Benchmarks
// ============================================================================

fn snapshot_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [1_000usize, 10_000, 50_000].iter() {
        group
            .throughput(Throughput::Elements(*size as u64))
            .bench_with_input(BenchmarkId::new("build", size), size, |b, &size| {
                let input = jobs(size);
                b.iter(|| JobSnapshot::build(black_box(input.clone()), Utc::now()));
            });

        group.bench_with_input(BenchmarkId::new("search", size), size, |b, &size| {
            let snapshot = JobSnapshot::build(jobs(size), Utc::now());
            b.iter(|| snapshot.search(black_box("bnx-17")));
        });
    }

    let snapshot = JobSnapshot::build(jobs(10_000), Utc::now());
    group.bench_function("get_by_number_hit", |b| {
        b.iter(|| snapshot.get_by_number(black_box("BNX-5179")));
    });
    group.bench_function("get_by_id_miss", |b| {
        b.iter(|| snapshot.get_by_id(black_box("missing")));
    });

    group.finish();
}

// ============================================================================
// Cache Benchmarks
// ============================================================================

fn cache_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("job_cache");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in [100usize, 1_000, 10_000].iter() {
        group
            .throughput(Throughput::Elements(*size as u64))
            .bench_with_input(BenchmarkId::new("refresh", size), size, |b, &size| {
                let source = InMemoryJobSource::new(jobs(size));
                let cache = JobCache::new(CacheConfig::default());

                b.to_async(&rt).iter(|| async {
                    cache.try_refresh(black_box(&source)).await.expect("refresh")
                });
            });
    }

    group.bench_function("get_by_number", |b| {
        let cache = JobCache::new(CacheConfig::default());
        rt.block_on(cache.refresh(&InMemoryJobSource::new(jobs(10_000))));

        b.to_async(&rt)
            .iter(|| async { cache.get_by_number(black_box("BNX-5179")).await });
    });

    group.finish();
}

// ============================================================================
// Benchmark Registration
// ============================================================================

criterion_group!(benches, snapshot_benchmarks, cache_benchmarks);
criterion_main!(benches);
