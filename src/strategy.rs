//! Lookup strategies for single-job reads.
//!
//! [`JobService::find_job`](crate::service::JobService::find_job) takes a
//! strategy instead of boolean flags:
//!
//! | Strategy    | Snapshot hit | Snapshot miss        |
//! |-------------|--------------|----------------------|
//! | **Fresh**   | Return       | Return `None`        |
//! | **Refresh** | Return       | Fetch `GET /jobs/{id}` |
//! | **Bypass**  | Ignored      | Fetch `GET /jobs/{id}` |
//!
//! Remote results are never written into the snapshot; only a full refresh
//! publishes jobs.

/// Strategy enum controlling where a job lookup is answered from.
///
/// ```
/// use acculynx::strategy::LookupStrategy;
///
/// assert_eq!(LookupStrategy::default(), LookupStrategy::Refresh);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LookupStrategy {
    /// Snapshot only. A miss is `None`, no request is made.
    Fresh,

    /// Snapshot first, remote on a miss.
    #[default]
    Refresh,

    /// Remote only, for callers that need the current server state.
    Bypass,
}

impl LookupStrategy {
    pub fn reads_snapshot(&self) -> bool {
        !matches!(self, LookupStrategy::Bypass)
    }

    pub fn falls_back_to_remote(&self) -> bool {
        !matches!(self, LookupStrategy::Fresh)
    }
}

impl std::fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupStrategy::Fresh => write!(f, "Fresh"),
            LookupStrategy::Refresh => write!(f, "Refresh"),
            LookupStrategy::Bypass => write!(f, "Bypass"),
        }
    }
}
