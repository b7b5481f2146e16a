//! Metrics hooks for the job cache.
//!
//! Implement [`RefreshMetrics`] to forward cache activity to your monitoring
//! system. Every method has a default body that logs through the `log`
//! crate, so an empty impl gives you structured log lines:
//!
//! ```
//! use acculynx::observability::RefreshMetrics;
//!
//! struct LogOnly;
//! impl RefreshMetrics for LogOnly {}
//! ```
//!
//! Override only what you need:
//!
//! ```ignore
//! use acculynx::observability::RefreshMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl RefreshMetrics for PrometheusMetrics {
//!     fn record_refresh(&self, jobs: usize, duration: Duration) {
//!         // gauge!("acculynx_cached_jobs").set(jobs as f64);
//!         // histogram!("acculynx_refresh_seconds").record(duration);
//!     }
//! }
//!
//! // let cache = JobCache::new(CacheConfig::default())
//! //     .with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! The engine default is [`NoOpMetrics`]; the engine logs refresh outcomes
//! on its own regardless of the metrics handler.

use crate::error::Error;
use std::time::Duration;

/// Trait for job cache metrics collection.
pub trait RefreshMetrics: Send + Sync {
    /// A refresh pass published a snapshot of `jobs` jobs.
    fn record_refresh(&self, jobs: usize, duration: Duration) {
        debug!("Job cache refresh: {} jobs in {:?}", jobs, duration);
    }

    /// A refresh pass was abandoned; the previous snapshot stays live.
    fn record_refresh_failed(&self, error: &Error) {
        warn!("Job cache refresh failed: {}", error);
    }

    /// A page inside a batch failed and was skipped. The engine already
    /// logs the skip at `warn` level.
    fn record_page_error(&self, page_start_index: u32, error: &Error) {
        debug!("Job page at {} failed: {}", page_start_index, error);
    }

    fn record_hit(&self, key: &str) {
        debug!("Job cache HIT: {}", key);
    }

    fn record_miss(&self, key: &str) {
        debug!("Job cache MISS: {}", key);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Debug, Default)]
pub struct NoOpMetrics;

impl RefreshMetrics for NoOpMetrics {
    fn record_refresh(&self, _jobs: usize, _duration: Duration) {}
    fn record_refresh_failed(&self, _error: &Error) {}
    fn record_page_error(&self, _page_start_index: u32, _error: &Error) {}
    fn record_hit(&self, _key: &str) {}
    fn record_miss(&self, _key: &str) {}
}
