//! The paginated job source the cache refreshes from.
//!
//! [`JobSource`] decouples the cache engine from the HTTP client. The
//! production implementation is [`AccuLynxClient`](crate::client::AccuLynxClient);
//! [`InMemoryJobSource`] serves pages from a vector and can inject failures,
//! which makes refresh behaviour easy to exercise in tests.
//!
//! # Example
//!
//! ```
//! use acculynx::repository::{InMemoryJobSource, JobSource};
//! use acculynx::Job;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> acculynx::Result<()> {
//! let source = InMemoryJobSource::new((0..30).map(|i| Job::new(format!("job-{}", i))));
//! let page = source.fetch_page(25, 25).await?;
//! assert_eq!(page.len(), 5);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::models::Job;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

/// A remote collection of jobs that can be read one page at a time.
///
/// Returns the jobs at `[page_start_index, page_start_index + page_size)`.
/// An empty vector means the collection is exhausted at that offset.
///
/// # Errors
/// Failures carry the remote status code where one exists
/// (see [`Error::status_code`](crate::error::Error::status_code)).
pub trait JobSource: Send + Sync {
    fn fetch_page(
        &self,
        page_size: u32,
        page_start_index: u32,
    ) -> impl Future<Output = Result<Vec<Job>>> + Send;

    /// Fetch a single job by id, bypassing any cache.
    ///
    /// # Returns
    /// - `Ok(Some(job))` - Job found
    /// - `Ok(None)` - No job with that id
    fn fetch_job(&self, id: &str) -> impl Future<Output = Result<Option<Job>>> + Send;
}

// ============================================================================
// In-Memory Job Source
// ============================================================================

/// Job source backed by a vector, for tests, benches and demos.
///
/// - `fail_page(start, err)` makes the page at `start` return `err`
/// - `set_fail_all(Some(err))` makes every fetch return `err`; `None` clears it
/// - `with_latency(d)` delays each fetch, making concurrency observable
/// - `fetch_count()` / `peak_in_flight()` report what the cache asked for
pub struct InMemoryJobSource {
    jobs: RwLock<Vec<Job>>,
    failures: Mutex<HashMap<u32, crate::error::Error>>,
    fail_all: Mutex<Option<crate::error::Error>>,
    latency: Duration,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryJobSource {
    pub fn new(jobs: impl IntoIterator<Item = Job>) -> Self {
        InMemoryJobSource {
            jobs: RwLock::new(jobs.into_iter().collect()),
            failures: Mutex::new(HashMap::new()),
            fail_all: Mutex::new(None),
            latency: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// `count` jobs with ids `job-{i}` and numbers `{prefix}-{i}`.
    pub fn numbered(count: usize, prefix: &str) -> Self {
        Self::new((0..count).map(|i| {
            Job::new(format!("job-{}", i))
                .with_number(format!("{}-{}", prefix, i))
                .with_name(format!("Job {}", i))
        }))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replace the whole collection.
    pub fn set_jobs(&self, jobs: impl IntoIterator<Item = Job>) {
        *self.jobs.write().unwrap_or_else(PoisonError::into_inner) = jobs.into_iter().collect();
    }

    pub fn fail_page(&self, page_start_index: u32, error: crate::error::Error) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(page_start_index, error);
    }

    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.set_fail_all(None);
    }

    /// Make every fetch fail with `error` (or stop doing so with `None`).
    pub fn set_fail_all(&self, error: Option<crate::error::Error>) {
        *self.fail_all.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `fetch_page` calls so far (single-job fetches excluded).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn page(&self, page_size: u32, page_start_index: u32) -> Result<Vec<Job>> {
        if let Some(err) = self
            .fail_all
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(err);
        }
        if let Some(err) = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&page_start_index)
        {
            return Err(err.clone());
        }

        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(jobs
            .iter()
            .skip(page_start_index as usize)
            .take(page_size as usize)
            .cloned()
            .collect())
    }
}

impl Default for InMemoryJobSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl JobSource for InMemoryJobSource {
    async fn fetch_page(&self, page_size: u32, page_start_index: u32) -> Result<Vec<Job>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.page(page_size, page_start_index);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<Job>> {
        if let Some(err) = self
            .fail_all
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(err);
        }
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(jobs.iter().find(|job| job.id == id).cloned())
    }
}
