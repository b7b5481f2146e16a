//! High-level job service for applications.
//!
//! Bundles a job source (normally [`AccuLynxClient`]) with a shared
//! [`JobCache`] and owns the cache's background refresh lifecycle.

use crate::cache::{JobCache, RefreshReport};
use crate::client::AccuLynxClient;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::Job;
use crate::observability::RefreshMetrics;
use crate::repository::JobSource;
use crate::strategy::LookupStrategy;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Job lookups backed by a periodically refreshed cache.
///
/// Cloning is cheap; clones share the source and the cache.
///
/// # Example
///
/// ```no_run
/// use acculynx::{AccuLynxClient, CacheConfig, JobService, LookupStrategy};
///
/// # async fn run() -> acculynx::Result<()> {
/// let client = AccuLynxClient::from_env()?;
/// let service = JobService::new(client, CacheConfig::from_env()?);
///
/// service.start().await?;
/// if let Some(job) = service.job_by_number("BNX-5179").await {
///     println!("{:?}", job.job_name);
/// }
/// let job = service.find_job("4f3c-...", LookupStrategy::Refresh).await?;
/// service.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct JobService<S: JobSource = AccuLynxClient> {
    source: Arc<S>,
    cache: Arc<JobCache>,
}

impl<S: JobSource> Clone for JobService<S> {
    fn clone(&self) -> Self {
        JobService {
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: JobSource + 'static> JobService<S> {
    pub fn new(source: S, config: CacheConfig) -> Self {
        JobService {
            source: Arc::new(source),
            cache: Arc::new(JobCache::new(config)),
        }
    }

    /// Create a new job service with custom metrics.
    pub fn with_metrics(source: S, config: CacheConfig, metrics: Box<dyn RefreshMetrics>) -> Self {
        JobService {
            source: Arc::new(source),
            cache: Arc::new(JobCache::new(config).with_metrics(metrics)),
        }
    }

    /// Share an existing source and cache.
    pub fn from_parts(source: Arc<S>, cache: Arc<JobCache>) -> Self {
        JobService { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &Arc<JobCache> {
        &self.cache
    }

    /// Load the cache now, then keep it refreshed every
    /// `refresh_interval`.
    ///
    /// The background loop is started even when the initial pass fails, so
    /// the cache recovers on the next tick.
    ///
    /// # Errors
    /// The error of the initial refresh pass.
    pub async fn start(&self) -> Result<RefreshReport> {
        let initial = self.cache.try_refresh(self.source.as_ref()).await;
        if let Err(e) = &initial {
            warn!("Initial job cache refresh failed, retrying in background: {}", e);
        }

        let interval = self.cache.config().refresh_interval;
        self.cache
            .start_background_refresh_in(Arc::clone(&self.source), interval, interval)
            .await;

        initial
    }

    /// Stop the background loop. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.cache.stop_background_refresh().await;
    }

    /// Look a job up by id according to `strategy`.
    ///
    /// Remote results are returned as-is and never written into the
    /// snapshot.
    ///
    /// # Errors
    /// Only remote fetches fail; snapshot reads never do.
    pub async fn find_job(&self, id: &str, strategy: LookupStrategy) -> Result<Option<Arc<Job>>> {
        if strategy.reads_snapshot() {
            if let Some(job) = self.cache.get_by_id(id).await {
                return Ok(Some(job));
            }
        }
        if !strategy.falls_back_to_remote() {
            return Ok(None);
        }

        debug!("Fetching job {} from source ({})", id, strategy);
        Ok(self.source.fetch_job(id).await?.map(Arc::new))
    }

    pub async fn job_by_number(&self, number: &str) -> Option<Arc<Job>> {
        self.cache.get_by_number(number).await
    }

    pub async fn search_jobs(&self, query: &str) -> Vec<Arc<Job>> {
        self.cache.search(query).await
    }

    /// Run one refresh pass now, outside the background schedule.
    pub async fn refresh_jobs(&self) -> Result<RefreshReport> {
        self.cache.try_refresh(self.source.as_ref()).await
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.cache.last_refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::repository::InMemoryJobSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn service(count: usize) -> JobService<InMemoryJobSource> {
        JobService::new(InMemoryJobSource::numbered(count, "BNX"), CacheConfig::default())
    }

    #[tokio::test]
    async fn test_find_job_strategies() {
        let service = service(10);
        service.refresh_jobs().await.expect("refresh");

        // added remotely after the snapshot was taken
        let mut jobs: Vec<Job> = (0..10)
            .map(|i| Job::new(format!("job-{}", i)).with_number(format!("BNX-{}", i)))
            .collect();
        jobs.push(Job::new("late").with_number("BNX-LATE"));
        service.source().set_jobs(jobs);

        assert!(service
            .find_job("job-3", LookupStrategy::Fresh)
            .await
            .expect("fresh")
            .is_some());
        assert!(service
            .find_job("late", LookupStrategy::Fresh)
            .await
            .expect("fresh")
            .is_none());

        let late = service
            .find_job("late", LookupStrategy::Refresh)
            .await
            .expect("refresh");
        assert_eq!(late.map(|j| j.id.clone()), Some("late".to_string()));
        // not written back
        assert!(service.cache().get_by_id("late").await.is_none());

        assert!(service
            .find_job("missing", LookupStrategy::Bypass)
            .await
            .expect("bypass")
            .is_none());
    }

    #[tokio::test]
    async fn test_bypass_surfaces_remote_errors() {
        let service = service(3);
        service.refresh_jobs().await.expect("refresh");
        service
            .source()
            .set_fail_all(Some(Error::from_status(503, "down")));

        // snapshot reads are unaffected
        assert!(service
            .find_job("job-1", LookupStrategy::Refresh)
            .await
            .expect("hit")
            .is_some());

        let err = service
            .find_job("job-1", LookupStrategy::Bypass)
            .await
            .expect_err("remote down");
        assert_eq!(err.status_code(), Some(503));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_shutdown() {
        let service = service(37);

        let report = service.start().await.expect("initial refresh");
        assert_eq!(report.jobs, 37);
        assert!(service.cache().is_background_running().await);
        assert!(service.last_refresh().await.is_some());
        assert_eq!(service.source().fetch_count(), 26);

        // next pass one interval later
        tokio::time::sleep(Duration::from_secs(3601)).await;
        assert_eq!(service.source().fetch_count(), 52);

        service.shutdown().await;
        service.shutdown().await;
        assert!(!service.cache().is_background_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reports_initial_failure_but_keeps_loop() {
        let service = service(5);
        service
            .source()
            .set_fail_all(Some(Error::from_status(401, "")));

        let err = service.start().await.expect_err("initial refresh fails");
        assert_eq!(err.status_code(), Some(401));
        assert!(service.cache().is_background_running().await);

        service.source().set_fail_all(None);
        tokio::time::sleep(Duration::from_secs(3601)).await;
        assert_eq!(service.search_jobs("bnx-4").await.len(), 1);
        assert!(service.job_by_number("BNX-2").await.is_some());

        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_reaches_metrics() {
        #[derive(Default)]
        struct FailureCounter(Arc<AtomicUsize>);

        impl RefreshMetrics for FailureCounter {
            fn record_refresh_failed(&self, _error: &Error) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = FailureCounter::default();
        let failures = Arc::clone(&counter.0);
        let source = InMemoryJobSource::numbered(5, "BNX");
        source.set_fail_all(Some(Error::from_status(500, "")));
        let service = JobService::with_metrics(source, CacheConfig::default(), Box::new(counter));

        assert!(service.start().await.is_err());
        assert_eq!(failures.load(Ordering::SeqCst), 1);

        assert!(service.refresh_jobs().await.is_err());
        assert_eq!(failures.load(Ordering::SeqCst), 2);

        service.shutdown().await;
    }

    #[test]
    fn test_service_clone_shares_cache() {
        let first = service(1);
        let second = first.clone();
        assert!(Arc::ptr_eq(first.cache(), second.cache()));
    }
}
