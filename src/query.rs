//! Query parameters for `GET /jobs`.

use chrono::NaiveDate;
use std::fmt;

/// Default number of jobs per page requested from the API.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Highest `pageStartIndex` the API accepts.
pub const MAX_PAGE_START_INDEX: u32 = 100_000;

/// Date field used for filtering and sorting jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateFilterType {
    CreatedDate,
    ModifiedDate,
    MilestoneDate,
}

impl DateFilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateFilterType::CreatedDate => "CreatedDate",
            DateFilterType::ModifiedDate => "ModifiedDate",
            DateFilterType::MilestoneDate => "MilestoneDate",
        }
    }
}

impl fmt::Display for DateFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "Ascending",
            SortOrder::Descending => "Descending",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter, sort and paging options for listing jobs.
///
/// # Example
///
/// ```
/// use acculynx::query::{DateFilterType, JobQuery, SortOrder};
///
/// let query = JobQuery::page(10, 0)
///     .with_includes(["contact"])
///     .sorted_by(DateFilterType::ModifiedDate, SortOrder::Descending);
/// let pairs = query.to_query_pairs();
/// assert!(pairs.contains(&("sortOrder", "Descending".to_string())));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobQuery {
    pub page_size: u32,
    pub page_start_index: u32,
    pub includes: Vec<String>,
    pub filter_by_date: Option<DateFilterType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub milestones: Vec<String>,
    pub sort_by: Option<DateFilterType>,
    pub sort_order: Option<SortOrder>,
}

impl Default for JobQuery {
    fn default() -> Self {
        JobQuery {
            page_size: DEFAULT_PAGE_SIZE,
            page_start_index: 0,
            includes: Vec::new(),
            filter_by_date: None,
            start_date: None,
            end_date: None,
            milestones: Vec::new(),
            sort_by: None,
            sort_order: None,
        }
    }
}

impl JobQuery {
    /// Plain page request with no filters.
    pub fn page(page_size: u32, page_start_index: u32) -> Self {
        JobQuery {
            page_size,
            page_start_index,
            ..Default::default()
        }
    }

    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_milestones<I, S>(mut self, milestones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.milestones = milestones.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to jobs whose `field` date lies in the given range.
    pub fn filtered_by(
        mut self,
        field: DateFilterType,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        self.filter_by_date = Some(field);
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn sorted_by(mut self, field: DateFilterType, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_order = Some(order);
        self
    }

    /// Same filters, different page.
    pub fn at_page(&self, page_start_index: u32) -> Self {
        JobQuery {
            page_start_index,
            ..self.clone()
        }
    }

    /// Encode as URL query pairs. Empty lists and unset options are omitted.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("pageSize", self.page_size.to_string()),
            ("pageStartIndex", self.page_start_index.to_string()),
        ];

        if !self.includes.is_empty() {
            pairs.push(("includes", self.includes.join(",")));
        }
        if let Some(field) = self.filter_by_date {
            pairs.push(("filterByDate", field.to_string()));
        }
        if let Some(date) = self.start_date {
            pairs.push(("startDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.end_date {
            pairs.push(("endDate", date.format("%Y-%m-%d").to_string()));
        }
        if !self.milestones.is_empty() {
            pairs.push(("milestones", self.milestones.join(",")));
        }
        if let Some(field) = self.sort_by {
            pairs.push(("sortBy", field.to_string()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sortOrder", order.to_string()));
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_pairs() {
        let pairs = JobQuery::default().to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("pageSize", "25".to_string()),
                ("pageStartIndex", "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_full_query_pairs() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let query = JobQuery::page(5, 50)
            .with_includes(["contact", "initialAppointment"])
            .with_milestones(["Lead", "Prospect"])
            .filtered_by(DateFilterType::CreatedDate, Some(start), Some(end))
            .sorted_by(DateFilterType::ModifiedDate, SortOrder::Descending);

        let pairs = query.to_query_pairs();
        assert!(pairs.contains(&("pageSize", "5".to_string())));
        assert!(pairs.contains(&("pageStartIndex", "50".to_string())));
        assert!(pairs.contains(&("includes", "contact,initialAppointment".to_string())));
        assert!(pairs.contains(&("milestones", "Lead,Prospect".to_string())));
        assert!(pairs.contains(&("filterByDate", "CreatedDate".to_string())));
        assert!(pairs.contains(&("startDate", "2024-01-01".to_string())));
        assert!(pairs.contains(&("endDate", "2024-02-01".to_string())));
        assert!(pairs.contains(&("sortBy", "ModifiedDate".to_string())));
        assert!(pairs.contains(&("sortOrder", "Descending".to_string())));
    }

    #[test]
    fn test_at_page_keeps_filters() {
        let query = JobQuery::default().with_includes(["contact"]);
        let next = query.at_page(25);
        assert_eq!(next.page_start_index, 25);
        assert_eq!(next.includes, vec!["contact".to_string()]);
    }
}
