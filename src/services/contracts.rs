//! Active-contract lookups over contract revisions.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::calculation::{QueryPeriod, current_revisions};
use crate::error::{EngineError, EngineResult};
use crate::models::{ContractInterval, Owner, OwnerId};
use crate::store::LeaveStore;

/// Answers which contracts, and which owners, are active when.
///
/// Only the current revision of each non-deleted contract is considered.
/// No query here fails on an empty result.
///
/// # Example
///
/// ```
/// use leave_engine::models::{ContractId, OwnerId};
/// use leave_engine::services::IntervalIndex;
/// use leave_engine::store::InMemoryStore;
/// use chrono::NaiveDate;
///
/// let date = |m: u32, d: u32| NaiveDate::from_ymd_opt(2016, m, d).unwrap();
/// let mut store = InMemoryStore::new();
/// store.add_owner(OwnerId(1), "Ada Lovelace");
/// store.add_contract_revision(
///     ContractId(1),
///     OwnerId(1),
///     date(1, 1),
///     Some(date(6, 30)),
///     date(1, 1).and_hms_opt(9, 0, 0).unwrap(),
/// );
///
/// let index = IntervalIndex::new(&store);
/// assert_eq!(index.active_owner_count(date(3, 1)).unwrap(), 1);
/// assert_eq!(index.active_owner_count(date(7, 1)).unwrap(), 0);
/// ```
pub struct IntervalIndex<'a, S: LeaveStore> {
    store: &'a S,
}

impl<'a, S: LeaveStore> IntervalIndex<'a, S> {
    /// Creates an index over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Current contract revisions active in the query period.
    ///
    /// # Arguments
    ///
    /// * `start` - Lower bound; `None` is unbounded
    /// * `end` - Upper bound; `None` is unbounded, or the same day as `start`
    ///   when only `start` is given
    /// * `owner` - Restrict to one owner
    ///
    /// # Returns
    ///
    /// Matching revisions ordered by period start, then contract id.
    pub fn active_contracts_in_period(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        owner: Option<OwnerId>,
    ) -> EngineResult<Vec<ContractInterval>> {
        let period = QueryPeriod::new(start, end);

        let mut active: Vec<ContractInterval> = self
            .current_intervals(owner)?
            .into_iter()
            .filter(|i| period.overlaps(i.period_start, i.period_end))
            .collect();
        active.sort_by_key(|i| (i.period_start, i.contract_id));

        debug!(
            start = ?period.start,
            end = ?period.end,
            owner = ?owner,
            matches = active.len(),
            "Queried active contracts"
        );
        Ok(active)
    }

    /// Distinct owners with an active contract in the query period, ordered
    /// by display name then id.
    pub fn owners_with_active_contract_in_period(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> EngineResult<Vec<Owner>> {
        let ids: BTreeSet<OwnerId> = self
            .active_contracts_in_period(start, end, None)?
            .into_iter()
            .map(|i| i.owner_id)
            .collect();

        let mut owners = ids
            .into_iter()
            .map(|id| {
                self.store
                    .load_owner(id)?
                    .ok_or_else(|| EngineError::not_found("Contract owner", id))
            })
            .collect::<EngineResult<Vec<Owner>>>()?;
        owners.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(owners)
    }

    /// The owner's contract covering `as_of`.
    ///
    /// When corrections overlap, the most recently saved revision wins.
    pub fn current_contract_for_owner(
        &self,
        owner: OwnerId,
        as_of: NaiveDate,
    ) -> EngineResult<Option<ContractInterval>> {
        Ok(self
            .current_intervals(Some(owner))?
            .into_iter()
            .filter(|i| i.contains(as_of))
            .max_by_key(|i| (i.revision, i.id)))
    }

    /// Number of distinct owners with a contract active on `as_of`.
    pub fn active_owner_count(&self, as_of: NaiveDate) -> EngineResult<usize> {
        let owners: BTreeSet<OwnerId> = self
            .active_contracts_in_period(Some(as_of), Some(as_of), None)?
            .into_iter()
            .map(|i| i.owner_id)
            .collect();
        Ok(owners.len())
    }

    /// Current revisions, optionally narrowed to one owner.
    ///
    /// A revision can move a contract to another owner, so the owner filter
    /// applies only after revisions are reduced.
    fn current_intervals(&self, owner: Option<OwnerId>) -> EngineResult<Vec<ContractInterval>> {
        let intervals = self.store.load_intervals(None, false)?;
        Ok(current_revisions(&intervals)
            .into_iter()
            .filter(|i| owner.is_none_or(|owner| i.owner_id == owner))
            .collect())
    }
}
