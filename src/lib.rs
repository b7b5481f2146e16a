//! # acculynx
//!
//! Typed async client for the AccuLynx REST API with an in-memory job cache.
//!
//! ## Features
//!
//! - **Client:** jobs, messages, payments, document and media uploads,
//!   leads and customers over `reqwest`
//! - **Job cache:** the whole job list held in memory, indexed by id and job
//!   number, searchable by substring
//! - **Bulk refresh:** concurrent page batches under a global in-flight limit;
//!   a failed page is skipped, a failed first page keeps the old snapshot
//! - **Atomic publication:** readers always see one complete refresh pass
//! - **Background refresh:** a cancellable tokio task on a fixed interval
//! - **Pluggable sources:** anything implementing [`JobSource`] can feed the
//!   cache, including the bundled [`InMemoryJobSource`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use acculynx::{AccuLynxClient, CacheConfig, JobService};
//!
//! # async fn run() -> acculynx::Result<()> {
//! let client = AccuLynxClient::from_env()?;
//! let service = JobService::new(client, CacheConfig::default());
//!
//! service.start().await?;
//! for job in service.search_jobs("BNX-51").await {
//!     println!("{} {:?}", job.id, job.job_name);
//! }
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ### Using the cache directly
//!
//! ```
//! use acculynx::{CacheConfig, InMemoryJobSource, JobCache};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = JobCache::new(CacheConfig::default().with_page_size(10));
//! cache.refresh(&InMemoryJobSource::numbered(42, "BNX")).await;
//! assert_eq!(cache.search("bnx-4").await.len(), 3); // BNX-4, BNX-40, BNX-41
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod query;
pub mod repository;
pub mod service;
pub mod snapshot;
pub mod strategy;

// Re-exports for convenience
pub use cache::{JobCache, RefreshReport};
pub use client::{AccuLynxClient, DocumentUpload, MediaUpload};
pub use config::{CacheConfig, ClientConfig};
pub use error::{Error, Result};
pub use models::Job;
pub use observability::{NoOpMetrics, RefreshMetrics};
pub use query::{DateFilterType, JobQuery, SortOrder};
pub use repository::{InMemoryJobSource, JobSource};
pub use service::JobService;
pub use snapshot::JobSnapshot;
pub use strategy::LookupStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
