//! Job cache engine: bulk refresh, snapshot publication, lookups and the
//! background refresh loop.
//!
//! # Refresh pass
//!
//! ```text
//! page 0 ──► batch [25 pages concurrently] ──► batch ... ──► batch with no jobs
//!                                                                   │
//!                                     build JobSnapshot ◄───────────┘
//!                                            │
//!                               write lock: swap Arc<JobSnapshot>
//! ```
//!
//! A failed page inside a batch contributes nothing and the pass goes on. A
//! failed first page abandons the pass and the published snapshot stays as
//! it was. Every page fetch holds a permit of the admission semaphore, which
//! caps outstanding requests independently of batching.

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::models::Job;
use crate::observability::{NoOpMetrics, RefreshMetrics};
use crate::repository::JobSource;
use crate::snapshot::JobSnapshot;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outcome of one successful refresh pass.
#[derive(Clone, Debug)]
pub struct RefreshReport {
    /// Jobs in the published snapshot (after de-duplication by id).
    pub jobs: usize,
    /// Pages that returned at least one job.
    pub pages: usize,
    /// Pages that failed and were skipped.
    pub failed_pages: usize,
    /// Concurrent batches issued after the first page.
    pub batches: usize,
    pub duration: Duration,
    pub captured_at: DateTime<Utc>,
}

struct BackgroundRefresh {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl BackgroundRefresh {
    async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!("Job cache refresh loop panicked: {}", e);
            }
        }
    }
}

/// In-memory index over every job of the account.
///
/// The cache starts empty. [`refresh`](JobCache::refresh) replaces the whole
/// snapshot in one step; lookups always see a single refresh pass.
///
/// # Example
///
/// ```
/// use acculynx::cache::JobCache;
/// use acculynx::config::CacheConfig;
/// use acculynx::repository::InMemoryJobSource;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = InMemoryJobSource::numbered(37, "BNX");
/// let cache = JobCache::new(CacheConfig::default());
///
/// cache.refresh(&source).await;
/// assert_eq!(cache.len().await, 37);
/// assert!(cache.get_by_number("BNX-12").await.is_some());
/// # }
/// ```
pub struct JobCache {
    config: CacheConfig,
    snapshot: RwLock<Arc<JobSnapshot>>,
    admission: Semaphore,
    metrics: Box<dyn RefreshMetrics>,
    background: Mutex<Option<BackgroundRefresh>>,
}

impl JobCache {
    pub fn new(config: CacheConfig) -> Self {
        let permits = config.max_in_flight.max(1);
        JobCache {
            config,
            snapshot: RwLock::new(Arc::new(JobSnapshot::empty())),
            admission: Semaphore::new(permits),
            metrics: Box::new(NoOpMetrics),
            background: Mutex::new(None),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn RefreshMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Reload every job from `source` and publish a new snapshot.
    ///
    /// Failures are logged and reported to the metrics handler, never
    /// returned: when a pass is abandoned the previous snapshot remains
    /// authoritative. Use [`try_refresh`](JobCache::try_refresh) to observe
    /// the outcome.
    pub async fn refresh<S: JobSource>(&self, source: &S) {
        if let Err(e) = self.try_refresh(source).await {
            error!("Error refreshing job cache: {}", e);
        }
    }

    /// Same pass as [`refresh`](JobCache::refresh), returning its outcome.
    ///
    /// # Errors
    ///
    /// - the error of the first page fetch, if it fails
    /// - the error of the last failed page when an entire batch failed, since
    ///   the end of the collection could not be established
    ///
    /// In both cases nothing is published and the failure is reported to
    /// the metrics handler.
    pub async fn try_refresh<S: JobSource>(&self, source: &S) -> Result<RefreshReport> {
        let outcome = self.run_pass(source).await;
        if let Err(e) = &outcome {
            self.metrics.record_refresh_failed(e);
        }
        outcome
    }

    async fn run_pass<S: JobSource>(&self, source: &S) -> Result<RefreshReport> {
        let timer = Instant::now();
        let page_size = self.config.page_size;
        let batch_size = self.config.batch_size;

        let mut jobs: Vec<Job> = self.fetch_page(source, 0).await?;
        let mut pages = usize::from(!jobs.is_empty());
        let mut failed_pages = 0;
        let mut batches = 0;
        let mut start_index = page_size;

        loop {
            let offsets: Vec<u32> = (0..batch_size)
                .map(|i| start_index.saturating_add(i.saturating_mul(page_size)))
                .collect();
            start_index = start_index.saturating_add(batch_size.saturating_mul(page_size));
            batches += 1;

            let results = join_all(offsets.iter().map(|&offset| self.fetch_page(source, offset))).await;

            let mut new_jobs_found = false;
            let mut any_page_succeeded = false;
            let mut last_error = None;
            for (offset, result) in offsets.into_iter().zip(results) {
                match result {
                    Ok(page) => {
                        any_page_succeeded = true;
                        if !page.is_empty() {
                            new_jobs_found = true;
                            pages += 1;
                            jobs.extend(page);
                        }
                    }
                    Err(e) => {
                        failed_pages += 1;
                        warn!("Skipping job page at {}: {}", offset, e);
                        self.metrics.record_page_error(offset, &e);
                        last_error = Some(e);
                    }
                }
            }

            debug!("Cached {} jobs after batch {}...", jobs.len(), batches);

            if !new_jobs_found {
                if !any_page_succeeded {
                    // No page answered, so the end of the collection is unknown.
                    return Err(last_error.unwrap_or_else(|| {
                        Error::Other("job refresh batch produced no results".to_string())
                    }));
                }
                break;
            }

            if !self.config.batch_pause.is_zero() {
                tokio::time::sleep(self.config.batch_pause).await;
            }
        }

        let captured_at = Utc::now();
        let snapshot = Arc::new(JobSnapshot::build(jobs, captured_at));
        let job_count = snapshot.len();
        self.publish(snapshot).await;

        let duration = timer.elapsed();
        self.metrics.record_refresh(job_count, duration);
        info!(
            "✓ Job cache refreshed with {} jobs in {:?} ({} pages, {} failed)",
            job_count, duration, pages, failed_pages
        );

        Ok(RefreshReport {
            jobs: job_count,
            pages,
            failed_pages,
            batches,
            duration,
            captured_at,
        })
    }

    async fn fetch_page<S: JobSource>(&self, source: &S, page_start_index: u32) -> Result<Vec<Job>> {
        let _permit = self
            .admission
            .acquire()
            .await
            .map_err(|e| Error::Other(format!("page admission closed: {}", e)))?;
        source
            .fetch_page(self.config.page_size, page_start_index)
            .await
    }

    async fn publish(&self, snapshot: Arc<JobSnapshot>) {
        let mut current = self.snapshot.write().await;
        *current = snapshot;
    }

    // ------------------------------------------------------------------------
    // Background loop
    // ------------------------------------------------------------------------

    /// Refresh now, then every `interval`, until stopped.
    ///
    /// A loop that is already running is stopped first, so at most one loop
    /// exists per cache. The loop survives failed refreshes. It ends on
    /// [`stop_background_refresh`](JobCache::stop_background_refresh) or once
    /// the last `Arc` to the cache is dropped.
    pub async fn start_background_refresh<S>(self: &Arc<Self>, source: Arc<S>, interval: Duration)
    where
        S: JobSource + 'static,
    {
        self.start_background_refresh_in(source, interval, Duration::ZERO)
            .await;
    }

    /// Like [`start_background_refresh`](JobCache::start_background_refresh),
    /// but the first pass runs after `initial_delay`.
    pub async fn start_background_refresh_in<S>(
        self: &Arc<Self>,
        source: Arc<S>,
        interval: Duration,
        initial_delay: Duration,
    ) where
        S: JobSource + 'static,
    {
        let mut slot = self.background.lock().await;
        if let Some(previous) = slot.take() {
            info!("Replacing running job cache refresh loop");
            previous.shutdown().await;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_refresh_loop(
            Arc::downgrade(self),
            source,
            interval,
            initial_delay,
            token.clone(),
        ));

        *slot = Some(BackgroundRefresh { token, handle });
    }

    /// Cancel the background loop and wait for it to finish.
    ///
    /// A refresh in progress is abandoned without publishing. Calling this
    /// when no loop is running does nothing.
    pub async fn stop_background_refresh(&self) {
        let task = self.background.lock().await.take();
        match task {
            Some(task) => {
                task.shutdown().await;
                info!("Job cache refresh loop stopped");
            }
            None => debug!("Job cache refresh loop not running"),
        }
    }

    pub async fn is_background_running(&self) -> bool {
        self.background
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// The currently published snapshot.
    pub async fn snapshot(&self) -> Arc<JobSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Arc<Job>> {
        let job = self.snapshot.read().await.get_by_id(id);
        self.record_lookup(&format!("job:{}", id), job.is_some());
        job
    }

    pub async fn get_by_number(&self, number: &str) -> Option<Arc<Job>> {
        let job = self.snapshot.read().await.get_by_number(number);
        self.record_lookup(&format!("job_number:{}", number), job.is_some());
        job
    }

    /// Jobs whose number or name contains `query`, ignoring case.
    pub async fn search(&self, query: &str) -> Vec<Arc<Job>> {
        self.snapshot.read().await.search(query)
    }

    /// When the published snapshot was captured; `None` before the first
    /// successful refresh.
    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.captured_at()
    }

    /// True when nothing was published yet or the snapshot is older than
    /// `max_age`.
    pub async fn is_stale(&self, max_age: Duration) -> bool {
        match self.last_refresh().await {
            None => true,
            Some(captured_at) => (Utc::now() - captured_at)
                .to_std()
                .map(|age| age > max_age)
                .unwrap_or(false),
        }
    }

    pub async fn len(&self) -> usize {
        self.snapshot.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot.read().await.is_empty()
    }

    fn record_lookup(&self, key: &str, hit: bool) {
        if hit {
            self.metrics.record_hit(key);
        } else {
            self.metrics.record_miss(key);
        }
    }
}

impl Default for JobCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl Drop for JobCache {
    fn drop(&mut self) {
        if let Some(task) = self.background.get_mut().take() {
            task.token.cancel();
        }
    }
}

async fn run_refresh_loop<S: JobSource>(
    cache: Weak<JobCache>,
    source: Arc<S>,
    interval: Duration,
    initial_delay: Duration,
    token: CancellationToken,
) {
    info!("Job cache refresh loop started (every {:?})", interval);

    if !initial_delay.is_zero() {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(initial_delay) => {}
        }
    }

    loop {
        let Some(strong) = cache.upgrade() else {
            break;
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = strong.refresh(source.as_ref()) => {}
        }
        drop(strong);

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!("Job cache refresh loop exited");
}
