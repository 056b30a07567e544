//! In-memory implementation of [`LeaveStore`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    BalanceChange, BalanceChangeId, ContractId, ContractInterval, IntervalId, NewBalanceChange,
    Owner, OwnerId, PatternId, SourceRef, WorkPattern, WorkWeek,
};

use super::LeaveStore;

/// A [`LeaveStore`] that keeps everything in memory.
///
/// Transactions snapshot the whole store and restore it when the closure
/// fails.
///
/// # Example
///
/// ```
/// use leave_engine::models::{OwnerId, SourceRef};
/// use leave_engine::store::{InMemoryStore, LeaveStore};
///
/// let mut store = InMemoryStore::new();
/// store.register_source(SourceRef::entitlement(1));
/// store.add_owner(OwnerId(1), "Ada Lovelace");
///
/// assert!(store.source_exists(SourceRef::entitlement(1)).unwrap());
/// assert!(!store.source_exists(SourceRef::entitlement(2)).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    patterns: BTreeMap<PatternId, WorkPattern>,
    ledger: Vec<BalanceChange>,
    sources: BTreeSet<SourceRef>,
    intervals: Vec<ContractInterval>,
    owners: BTreeMap<OwnerId, Owner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record that balance changes may point at.
    pub fn register_source(&mut self, source: SourceRef) {
        self.sources.insert(source);
    }

    /// Adds or renames a contract owner.
    pub fn add_owner(&mut self, id: OwnerId, display_name: impl Into<String>) {
        self.owners.insert(
            id,
            Owner {
                id,
                display_name: display_name.into(),
            },
        );
    }

    /// Saves a new revision of a contract's active period.
    pub fn add_contract_revision(
        &mut self,
        contract_id: ContractId,
        owner_id: OwnerId,
        period_start: NaiveDate,
        period_end: Option<NaiveDate>,
        revision: NaiveDateTime,
    ) -> IntervalId {
        let id = IntervalId(self.intervals.len() as u64 + 1);
        self.intervals.push(ContractInterval {
            id,
            contract_id,
            owner_id,
            period_start,
            period_end,
            deleted: false,
            revision,
        });
        debug!(interval_id = %id, contract_id = %contract_id, "Saved contract revision");
        id
    }

    /// Flags every revision of a contract as deleted.
    pub fn delete_contract(&mut self, contract_id: ContractId) -> EngineResult<()> {
        let mut found = false;
        for interval in self
            .intervals
            .iter_mut()
            .filter(|i| i.contract_id == contract_id)
        {
            interval.deleted = true;
            found = true;
        }

        if found {
            Ok(())
        } else {
            Err(EngineError::not_found("Contract", contract_id))
        }
    }
}

impl LeaveStore for InMemoryStore {
    fn load_work_pattern(&self, id: PatternId) -> EngineResult<Option<WorkPattern>> {
        Ok(self.patterns.get(&id).cloned())
    }

    fn load_work_patterns(&self) -> EngineResult<Vec<WorkPattern>> {
        let mut patterns: Vec<WorkPattern> = self.patterns.values().cloned().collect();
        patterns.sort_by_key(|p| (p.weight, p.id));
        Ok(patterns)
    }

    fn save_work_pattern(&mut self, pattern: WorkPattern) -> EngineResult<PatternId> {
        let id = pattern.id;
        self.patterns.insert(id, pattern);
        Ok(id)
    }

    fn next_pattern_id(&self) -> EngineResult<PatternId> {
        let last = self.patterns.keys().next_back().map(|id| id.0).unwrap_or(0);
        Ok(PatternId(last + 1))
    }

    fn load_weeks_and_days(&self, pattern_id: PatternId) -> EngineResult<Vec<WorkWeek>> {
        let mut weeks = self
            .patterns
            .get(&pattern_id)
            .map(|p| p.weeks.clone())
            .unwrap_or_default();
        weeks.sort_by_key(|w| w.number);
        Ok(weeks)
    }

    fn load_ledger_entries(&self, source: SourceRef) -> EngineResult<Vec<BalanceChange>> {
        let mut entries: Vec<BalanceChange> = self
            .ledger
            .iter()
            .filter(|e| e.source == source)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.created_at, e.id));
        Ok(entries)
    }

    fn append_ledger_entry(&mut self, entry: NewBalanceChange) -> EngineResult<BalanceChangeId> {
        if let Some(target) = entry.expired_balance_change_id {
            if self.find_compensating_entry(target)?.is_some() {
                return Err(EngineError::integrity(format!(
                    "entry {} already has an expiry entry",
                    target
                )));
            }
        }

        let id = BalanceChangeId(self.ledger.len() as u64 + 1);
        self.ledger.push(BalanceChange::from_new(id, entry));
        Ok(id)
    }

    fn find_compensating_entry(
        &self,
        source_entry_id: BalanceChangeId,
    ) -> EngineResult<Option<BalanceChange>> {
        Ok(self
            .ledger
            .iter()
            .find(|e| e.expired_balance_change_id == Some(source_entry_id))
            .cloned())
    }

    fn source_exists(&self, source: SourceRef) -> EngineResult<bool> {
        Ok(self.sources.contains(&source))
    }

    fn sources(&self) -> EngineResult<Vec<SourceRef>> {
        Ok(self.sources.iter().copied().collect())
    }

    fn load_intervals(
        &self,
        owner: Option<OwnerId>,
        include_deleted: bool,
    ) -> EngineResult<Vec<ContractInterval>> {
        Ok(self
            .intervals
            .iter()
            .filter(|i| include_deleted || !i.deleted)
            .filter(|i| owner.is_none_or(|owner| i.owner_id == owner))
            .cloned()
            .collect())
    }

    fn load_owner(&self, id: OwnerId) -> EngineResult<Option<Owner>> {
        Ok(self.owners.get(&id).cloned())
    }

    fn transaction<T, F>(&mut self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Self) -> EngineResult<T>,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(error = %err, "Rolling back in-memory transaction");
                *self = snapshot;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BalanceChangeType;
    use rust_decimal::Decimal;

    fn make_datetime(date_str: &str, time_str: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date_str, time_str), "%Y-%m-%d %H:%M:%S")
            .unwrap()
    }

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn credit(amount: i64, at: NaiveDateTime) -> NewBalanceChange {
        NewBalanceChange::new(
            BalanceChangeType::Entitlement,
            SourceRef::entitlement(1),
            Decimal::new(amount, 0),
            at,
        )
    }

    #[test]
    fn test_ledger_entries_are_ordered_by_time_then_id() {
        let mut store = InMemoryStore::new();
        let late = store
            .append_ledger_entry(credit(1, make_datetime("2016-02-01", "00:00:00")))
            .unwrap();
        let early = store
            .append_ledger_entry(credit(2, make_datetime("2016-01-01", "00:00:00")))
            .unwrap();
        let early_too = store
            .append_ledger_entry(credit(3, make_datetime("2016-01-01", "00:00:00")))
            .unwrap();

        let ids: Vec<BalanceChangeId> = store
            .load_ledger_entries(SourceRef::entitlement(1))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![early, early_too, late]);
    }

    #[test]
    fn test_second_compensating_entry_is_refused() {
        let mut store = InMemoryStore::new();
        let at = make_datetime("2016-01-01", "00:00:00");
        let source_entry = store.append_ledger_entry(credit(5, at)).unwrap();

        let mut expiry = NewBalanceChange::new(
            BalanceChangeType::Debit,
            SourceRef::entitlement(1),
            Decimal::new(-5, 0),
            at,
        );
        expiry.expired_balance_change_id = Some(source_entry);

        assert!(store.append_ledger_entry(expiry.clone()).is_ok());
        assert!(matches!(
            store.append_ledger_entry(expiry),
            Err(EngineError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut store = InMemoryStore::new();
        let at = make_datetime("2016-01-01", "00:00:00");

        let result: EngineResult<()> = store.transaction(|s| {
            s.append_ledger_entry(credit(5, at))?;
            Err(EngineError::integrity("abort"))
        });

        assert!(result.is_err());
        assert!(
            store
                .load_ledger_entries(SourceRef::entitlement(1))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_successful_transaction_commits() {
        let mut store = InMemoryStore::new();
        let at = make_datetime("2016-01-01", "00:00:00");

        store
            .transaction(|s| s.append_ledger_entry(credit(5, at)))
            .unwrap();

        assert_eq!(
            store
                .load_ledger_entries(SourceRef::entitlement(1))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_delete_contract_flags_every_revision() {
        let mut store = InMemoryStore::new();
        let saved = make_datetime("2016-01-01", "09:00:00");
        store.add_contract_revision(ContractId(1), OwnerId(1), make_date("2016-01-01"), None, saved);
        store.add_contract_revision(ContractId(1), OwnerId(1), make_date("2016-02-01"), None, saved);
        store.add_contract_revision(ContractId(2), OwnerId(2), make_date("2016-01-01"), None, saved);

        store.delete_contract(ContractId(1)).unwrap();

        assert_eq!(store.load_intervals(None, false).unwrap().len(), 1);
        assert_eq!(store.load_intervals(None, true).unwrap().len(), 3);
        assert_eq!(store.load_intervals(Some(OwnerId(1)), false).unwrap().len(), 0);
    }

    #[test]
    fn test_delete_unknown_contract_is_not_found() {
        let mut store = InMemoryStore::new();
        assert!(matches!(
            store.delete_contract(ContractId(7)),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_next_pattern_id_starts_at_one() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_pattern_id().unwrap(), PatternId(1));
    }
}
