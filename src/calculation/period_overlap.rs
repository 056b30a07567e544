//! Period overlap rules for contract intervals.
//!
//! Query bounds are optional: a missing start means "since forever", a
//! missing end means "until forever", and a start without an end narrows
//! the query to that single day.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{ContractId, ContractInterval};

/// Effective bounds of a period query, both inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPeriod {
    /// Lower bound; `None` is unbounded.
    pub start: Option<NaiveDate>,
    /// Upper bound; `None` is unbounded.
    pub end: Option<NaiveDate>,
}

impl QueryPeriod {
    /// Builds the effective query period from optional caller bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use leave_engine::calculation::QueryPeriod;
    /// use chrono::NaiveDate;
    ///
    /// let day = NaiveDate::from_ymd_opt(2016, 3, 3).unwrap();
    ///
    /// // A start on its own means "active on that exact date".
    /// let period = QueryPeriod::new(Some(day), None);
    /// assert_eq!(period.end, Some(day));
    ///
    /// // No bounds at all match everything.
    /// assert_eq!(QueryPeriod::new(None, None), QueryPeriod::unbounded());
    /// ```
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        match (start, end) {
            (Some(day), None) => Self::on(day),
            _ => Self { start, end },
        }
    }

    /// A period covering exactly one day.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            start: Some(date),
            end: Some(date),
        }
    }

    /// A period with no bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Checks whether `[period_start, period_end]` overlaps this query.
    ///
    /// An open `period_end` always satisfies the lower bound. A query whose
    /// start is after its end overlaps nothing.
    pub fn overlaps(&self, period_start: NaiveDate, period_end: Option<NaiveDate>) -> bool {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return false;
            }
        }

        let starts_in_time = self.end.is_none_or(|end| period_start <= end);
        let ends_in_time = match (period_end, self.start) {
            (Some(period_end), Some(start)) => period_end >= start,
            _ => true,
        };

        starts_in_time && ends_in_time
    }
}

/// Reduces contract revisions to the current revision of each contract.
///
/// Deleted revisions are dropped first; of what remains, the revision with
/// the latest `(revision, id)` wins. The result is ordered by contract id.
pub fn current_revisions(intervals: &[ContractInterval]) -> Vec<ContractInterval> {
    let mut latest: HashMap<ContractId, &ContractInterval> = HashMap::new();

    for interval in intervals.iter().filter(|i| !i.deleted) {
        latest
            .entry(interval.contract_id)
            .and_modify(|current| {
                if (interval.revision, interval.id) > (current.revision, current.id) {
                    *current = interval;
                }
            })
            .or_insert(interval);
    }

    let mut current: Vec<ContractInterval> = latest.into_values().cloned().collect();
    current.sort_by_key(|i| i.contract_id);
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntervalId, OwnerId};

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn revision(
        id: u64,
        contract: u64,
        start: &str,
        end: Option<&str>,
        saved: &str,
    ) -> ContractInterval {
        ContractInterval {
            id: IntervalId(id),
            contract_id: ContractId(contract),
            owner_id: OwnerId(1),
            period_start: make_date(start),
            period_end: end.map(make_date),
            deleted: false,
            revision: make_date(saved).and_hms_opt(12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_unbounded_query_matches_everything() {
        let period = QueryPeriod::unbounded();
        assert!(period.overlaps(make_date("1990-01-01"), Some(make_date("1990-01-02"))));
        assert!(period.overlaps(make_date("2090-01-01"), None));
    }

    #[test]
    fn test_single_day_query_is_inclusive() {
        let period = QueryPeriod::new(Some(make_date("2016-03-10")), None);
        assert!(period.overlaps(make_date("2016-01-01"), Some(make_date("2016-03-10"))));
        assert!(period.overlaps(make_date("2016-03-10"), None));
        assert!(!period.overlaps(make_date("2016-03-11"), None));
        assert!(!period.overlaps(make_date("2016-01-01"), Some(make_date("2016-03-09"))));
    }

    #[test]
    fn test_open_ended_interval_satisfies_upper_bound() {
        let period = QueryPeriod::new(Some(make_date("2016-05-01")), Some(make_date("2016-06-01")));
        assert!(period.overlaps(make_date("2016-01-01"), None));
    }

    #[test]
    fn test_query_with_only_end_bound() {
        let period = QueryPeriod::new(None, Some(make_date("2016-06-01")));
        assert!(period.overlaps(make_date("2000-01-01"), Some(make_date("2000-01-02"))));
        assert!(!period.overlaps(make_date("2016-06-02"), None));
    }

    #[test]
    fn test_intervals_touching_query_edges_overlap() {
        let period = QueryPeriod::new(Some(make_date("2016-02-01")), Some(make_date("2016-02-29")));
        assert!(period.overlaps(make_date("2016-01-01"), Some(make_date("2016-02-01"))));
        assert!(period.overlaps(make_date("2016-02-29"), Some(make_date("2016-12-31"))));
        assert!(!period.overlaps(make_date("2016-03-01"), None));
    }

    #[test]
    fn test_inverted_query_matches_nothing() {
        let period = QueryPeriod::new(Some(make_date("2016-06-01")), Some(make_date("2016-05-01")));
        assert!(!period.overlaps(make_date("2016-01-01"), None));
    }

    #[test]
    fn test_current_revisions_picks_latest_per_contract() {
        let revisions = vec![
            revision(1, 1, "2016-02-01", Some("2016-03-10"), "2016-01-01"),
            revision(2, 1, "2016-01-15", Some("2016-10-27"), "2016-01-05"),
            revision(3, 2, "2016-04-01", None, "2016-01-02"),
        ];

        let current = current_revisions(&revisions);
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].id, IntervalId(2));
        assert_eq!(current[0].period_start, make_date("2016-01-15"));
        assert_eq!(current[1].id, IntervalId(3));
    }

    #[test]
    fn test_current_revisions_skips_deleted() {
        let mut deleted = revision(1, 1, "2016-02-01", None, "2016-01-01");
        deleted.deleted = true;

        assert!(current_revisions(&[deleted]).is_empty());
    }

    #[test]
    fn test_same_revision_time_prefers_higher_id() {
        let revisions = vec![
            revision(5, 1, "2016-01-01", None, "2016-01-01"),
            revision(4, 1, "2017-01-01", None, "2016-01-01"),
        ];

        let current = current_revisions(&revisions);
        assert_eq!(current[0].id, IntervalId(5));
    }
}
