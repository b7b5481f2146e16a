//! Integration tests for the job cache
//!
//! These tests drive the cache through the public API with an in-memory
//! source, including concurrent readers and background refreshes.

use acculynx::{CacheConfig, Error, InMemoryJobSource, Job, JobCache, JobSnapshot, RefreshMetrics};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn numbered_jobs(count: usize, prefix: &str) -> Vec<Job> {
    (0..count)
        .map(|i| {
            Job::new(format!("{}-id-{}", prefix, i))
                .with_number(format!("{}-{}", prefix, i))
                .with_name(format!("{} job {}", prefix, i))
        })
        .collect()
}

/// Every job in the snapshot comes from the same generation and both
/// indexes agree with each other.
fn assert_consistent(snapshot: &JobSnapshot) {
    let Some(first) = snapshot.jobs().first() else {
        return;
    };
    let generation = first.id.split('-').next().unwrap_or_default().to_string();
    let expected_len = if generation == "OLD" { 20 } else { 30 };
    assert_eq!(snapshot.len(), expected_len, "mixed snapshot length");

    for job in snapshot.jobs() {
        assert!(job.id.starts_with(&generation), "mixed generations");
        let number = job.job_number.as_deref().expect("numbered");
        let by_number = snapshot.get_by_number(number).expect("number indexed");
        let by_id = snapshot.get_by_id(&job.id).expect("id indexed");
        assert!(Arc::ptr_eq(&by_number, &by_id));
    }
}

#[derive(Clone, Default)]
struct LookupCounter {
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl RefreshMetrics for LookupCounter {
    fn record_hit(&self, _key: &str) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn record_miss(&self, _key: &str) {
        self.misses.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_partial_refresh() {
    let source = Arc::new(
        InMemoryJobSource::new(numbered_jobs(20, "OLD")).with_latency(Duration::from_millis(2)),
    );
    let config = CacheConfig::default().with_page_size(5).with_batch_size(2);
    let cache = Arc::new(JobCache::new(config));
    cache.refresh(source.as_ref()).await;
    assert_eq!(cache.len().await, 20);

    source.set_jobs(numbered_jobs(30, "NEW"));
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        let done = Arc::clone(&done);
        readers.push(tokio::spawn(async move {
            let mut observed = 0usize;
            while !done.load(Ordering::SeqCst) {
                let snapshot = cache.snapshot().await;
                assert_consistent(&snapshot);
                observed += 1;
                tokio::task::yield_now().await;
            }
            observed
        }));
    }

    cache.refresh(source.as_ref()).await;
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.await.expect("reader task") > 0);
    }
    assert_eq!(cache.len().await, 30);
    assert!(cache.get_by_number("OLD-3").await.is_none());
    assert!(cache.get_by_number("NEW-29").await.is_some());
}

#[tokio::test]
async fn test_concurrent_refreshes_publish_whole_snapshots() {
    let old = InMemoryJobSource::new(numbered_jobs(20, "OLD")).with_latency(Duration::from_millis(1));
    let new = InMemoryJobSource::new(numbered_jobs(30, "NEW")).with_latency(Duration::from_millis(3));
    let cache = JobCache::new(CacheConfig::default().with_page_size(5).with_batch_size(3));

    tokio::join!(cache.refresh(&old), cache.refresh(&new));

    let snapshot = cache.snapshot().await;
    assert_consistent(&snapshot);
    assert!(snapshot.len() == 20 || snapshot.len() == 30);
}

#[tokio::test]
async fn test_shifted_collection_deduplicates_ids() {
    // an insert between page reads pushes job 24 onto page 2 as well
    let mut jobs = numbered_jobs(40, "NEW");
    jobs.insert(25, jobs[24].clone());
    let source = InMemoryJobSource::new(jobs);
    let cache = JobCache::default();

    let report = cache.try_refresh(&source).await.expect("refresh");

    assert_eq!(report.jobs, 40);
    assert_eq!(cache.len().await, 40);
    assert_consistent_numbers(&*cache.snapshot().await);
}

fn assert_consistent_numbers(snapshot: &JobSnapshot) {
    for job in snapshot.jobs() {
        if let Some(number) = job.job_number.as_deref() {
            let found = snapshot.get_by_number(number).expect("indexed");
            assert_eq!(found.id, job.id);
        }
    }
}

#[tokio::test]
async fn test_unnumbered_jobs_are_searchable_by_name_only() {
    let source = InMemoryJobSource::new(vec![
        Job::new("a").with_number("BNX-5179").with_name("Smith Residence"),
        Job::new("b").with_name("Warehouse Reroof"),
    ]);
    let cache = JobCache::default();
    cache.refresh(&source).await;

    assert_eq!(cache.len().await, 2);
    assert_eq!(cache.snapshot().await.numbered_len(), 1);
    assert_eq!(cache.search("reroof").await[0].id, "b");
    assert!(cache.get_by_id("b").await.is_some());
    assert_eq!(cache.search("BNX-5179").await.len(), 1);
}

#[tokio::test]
async fn test_lookup_metrics() {
    let counter = LookupCounter::default();
    let cache = JobCache::default().with_metrics(Box::new(counter.clone()));
    cache.refresh(&InMemoryJobSource::numbered(5, "BNX")).await;

    assert!(cache.get_by_id("job-1").await.is_some());
    assert!(cache.get_by_number("BNX-2").await.is_some());
    assert!(cache.get_by_number("BNX-99").await.is_none());

    assert_eq!(counter.hits.load(Ordering::SeqCst), 2);
    assert_eq!(counter.misses.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_every_failure_kind_keeps_previous_snapshot() {
    let source = InMemoryJobSource::numbered(30, "BNX");
    let cache = JobCache::default();
    cache.refresh(&source).await;
    let stamped = cache.last_refresh().await;

    for error in [
        Error::from_status(401, ""),
        Error::from_status(429, ""),
        Error::from_status(500, "boom"),
        Error::Transport("connection reset".to_string()),
        Error::Deserialization("unexpected token".to_string()),
    ] {
        source.set_fail_all(Some(error));
        assert!(cache.try_refresh(&source).await.is_err());
        assert_eq!(cache.len().await, 30);
        assert_eq!(cache.last_refresh().await, stamped);
    }
}

#[tokio::test(start_paused = true)]
async fn test_background_refresh_picks_up_remote_changes() {
    let source = Arc::new(InMemoryJobSource::new(numbered_jobs(20, "OLD")));
    let cache = Arc::new(JobCache::default());

    cache
        .start_background_refresh(Arc::clone(&source), Duration::from_secs(3600))
        .await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(cache.get_by_number("OLD-0").await.is_some());

    source.set_jobs(numbered_jobs(30, "NEW"));
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(cache.len().await, 30);
    assert!(cache.get_by_number("OLD-0").await.is_none());
    assert!(!cache.is_stale(Duration::from_secs(3600)).await);

    cache.stop_background_refresh().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropping_cache_ends_background_loop() {
    let source = Arc::new(InMemoryJobSource::numbered(3, "BNX"));
    let cache = Arc::new(JobCache::default());
    cache
        .start_background_refresh(Arc::clone(&source), Duration::from_secs(10))
        .await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    let fetched = source.fetch_count();

    drop(cache);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(source.fetch_count(), fetched);
}
