//! Immutable, indexed view of the job collection.
//!
//! A snapshot is built once from the jobs of one completed refresh pass and
//! never mutated afterwards. The cache publishes a new snapshot by swapping
//! an `Arc<JobSnapshot>`, so both indexes always come from the same pass.

use crate::models::Job;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Jobs from one refresh pass, indexed by id and by job number.
///
/// Both indexes point into `jobs`, so a job reachable by number is the very
/// same `Arc<Job>` reachable by id.
#[derive(Debug, Default)]
pub struct JobSnapshot {
    jobs: Vec<Arc<Job>>,
    by_id: HashMap<String, usize>,
    by_number: HashMap<String, usize>,
    captured_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// The snapshot in place before the first successful refresh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index `jobs` into a snapshot stamped with `captured_at`.
    ///
    /// When the same id appears more than once (the remote collection shifted
    /// between page reads) the later record replaces the earlier one in its
    /// original position. Duplicate job numbers resolve the same way.
    pub fn build(jobs: impl IntoIterator<Item = Job>, captured_at: DateTime<Utc>) -> Self {
        let mut entries: Vec<Arc<Job>> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();

        for job in jobs {
            match by_id.get(&job.id) {
                Some(&slot) => entries[slot] = Arc::new(job),
                None => {
                    by_id.insert(job.id.clone(), entries.len());
                    entries.push(Arc::new(job));
                }
            }
        }

        let by_number = entries
            .iter()
            .enumerate()
            .filter_map(|(slot, job)| {
                job.job_number
                    .as_deref()
                    .filter(|number| !number.is_empty())
                    .map(|number| (number.to_string(), slot))
            })
            .collect();

        JobSnapshot {
            jobs: entries,
            by_id,
            by_number,
            captured_at: Some(captured_at),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<Job>> {
        self.by_id.get(id).map(|&slot| Arc::clone(&self.jobs[slot]))
    }

    pub fn get_by_number(&self, number: &str) -> Option<Arc<Job>> {
        self.by_number
            .get(number)
            .map(|&slot| Arc::clone(&self.jobs[slot]))
    }

    /// Case-insensitive substring match on job number or job name.
    ///
    /// Results come back in snapshot order. A blank query matches nothing;
    /// any other query is matched as given, surrounding spaces included.
    pub fn search(&self, query: &str) -> Vec<Arc<Job>> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();

        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&needle))
        };

        self.jobs
            .iter()
            .filter(|job| contains(&job.job_number) || contains(&job.job_name))
            .cloned()
            .collect()
    }

    /// All jobs in snapshot order.
    pub fn jobs(&self) -> &[Arc<Job>] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs reachable through the number index. Jobs with a missing
    /// or empty number are not indexed.
    pub fn numbered_len(&self) -> usize {
        self.by_number.len()
    }

    /// `None` until a refresh has published.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobSnapshot {
        JobSnapshot::build(
            vec![
                Job::new("a").with_number("BNX-5179").with_name("Smith Residence"),
                Job::new("b").with_number("BNX-5180").with_name("Jones Roof"),
                Job::new("c").with_name("Unnumbered Gutter Job"),
            ],
            Utc::now(),
        )
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = JobSnapshot::empty();
        assert!(snapshot.is_empty());
        assert!(snapshot.captured_at().is_none());
        assert!(snapshot.get_by_id("a").is_none());
        assert!(snapshot.search("bnx").is_empty());
    }

    #[test]
    fn test_indexes() {
        let snapshot = sample();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.numbered_len(), 2);
        assert!(snapshot.captured_at().is_some());

        let by_number = snapshot.get_by_number("BNX-5179").expect("by number");
        let by_id = snapshot.get_by_id("a").expect("by id");
        assert!(Arc::ptr_eq(&by_number, &by_id));
        assert!(snapshot.get_by_number("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_last_wins() {
        let snapshot = JobSnapshot::build(
            vec![
                Job::new("a").with_number("N-1").with_name("old"),
                Job::new("b"),
                Job::new("a").with_number("N-1").with_name("new"),
            ],
            Utc::now(),
        );
        assert_eq!(snapshot.len(), 2);
        let job = snapshot.get_by_id("a").expect("job a");
        assert_eq!(job.job_name.as_deref(), Some("new"));
        assert_eq!(snapshot.jobs()[0].id, "a");
        assert!(Arc::ptr_eq(&job, &snapshot.get_by_number("N-1").expect("N-1")));
    }

    #[test]
    fn test_search_case_insensitive() {
        let snapshot = sample();

        let hits = snapshot.search("bnx-5179");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");

        let hits = snapshot.search("ROOF");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");

        let hits = snapshot.search("bnx");
        assert_eq!(
            hits.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        assert_eq!(snapshot.search("gutter").len(), 1);
        assert!(snapshot.search("nothing-like-this").is_empty());
    }

    #[test]
    fn test_search_blank_query() {
        let snapshot = sample();
        assert!(snapshot.search("").is_empty());
        assert!(snapshot.search("   ").is_empty());
    }

    #[test]
    fn test_empty_job_number_not_indexed() {
        let snapshot = JobSnapshot::build(
            vec![Job::new("a").with_number(""), Job::new("b").with_number("BNX-1")],
            Utc::now(),
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.numbered_len(), 1);
        assert!(snapshot.get_by_number("").is_none());
        assert_eq!(snapshot.get_by_number("BNX-1").expect("BNX-1").id, "b");
        assert!(snapshot.get_by_id("a").is_some());
    }

    #[test]
    fn test_search_keeps_surrounding_spaces() {
        let snapshot = sample();
        assert!(snapshot.search(" 5179").is_empty());
        assert_eq!(snapshot.search("smith residence").len(), 1);
        assert_eq!(snapshot.search(" residence")[0].id, "a");
    }
}
