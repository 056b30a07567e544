//! Persistence collaborator for the leave engine.
//!
//! The engine never talks to a database directly. Everything it reads or
//! writes goes through [`LeaveStore`], so a service layer can back it with
//! whatever storage it uses. [`InMemoryStore`] is the reference
//! implementation used by the HTTP API and the tests.

mod memory;

pub use memory::InMemoryStore;

use crate::error::EngineResult;
use crate::models::{
    BalanceChange, BalanceChangeId, ContractInterval, NewBalanceChange, Owner, OwnerId,
    PatternId, SourceRef, WorkPattern, WorkWeek,
};

/// Storage operations the engine needs.
///
/// Implementations must return ledger entries in `(created_at, id)` order
/// and must refuse a second compensating entry for the same source entry.
pub trait LeaveStore {
    /// Loads one work pattern with its weeks and days.
    fn load_work_pattern(&self, id: PatternId) -> EngineResult<Option<WorkPattern>>;

    /// Loads every work pattern, ordered by weight then id.
    fn load_work_patterns(&self) -> EngineResult<Vec<WorkPattern>>;

    /// Inserts or replaces a work pattern and returns its id.
    fn save_work_pattern(&mut self, pattern: WorkPattern) -> EngineResult<PatternId>;

    /// Returns the next free pattern id.
    fn next_pattern_id(&self) -> EngineResult<PatternId>;

    /// Loads the weeks of a pattern in rotation order.
    fn load_weeks_and_days(&self, pattern_id: PatternId) -> EngineResult<Vec<WorkWeek>>;

    /// Loads all ledger entries of a source in `(created_at, id)` order.
    fn load_ledger_entries(&self, source: SourceRef) -> EngineResult<Vec<BalanceChange>>;

    /// Appends an entry and returns its id.
    fn append_ledger_entry(&mut self, entry: NewBalanceChange) -> EngineResult<BalanceChangeId>;

    /// Finds the entry that forfeits `source_entry_id`, if any.
    fn find_compensating_entry(
        &self,
        source_entry_id: BalanceChangeId,
    ) -> EngineResult<Option<BalanceChange>>;

    /// Checks that the record a source reference points at exists.
    fn source_exists(&self, source: SourceRef) -> EngineResult<bool>;

    /// Lists every registered source.
    fn sources(&self) -> EngineResult<Vec<SourceRef>>;

    /// Loads contract revisions, optionally for one owner.
    fn load_intervals(
        &self,
        owner: Option<OwnerId>,
        include_deleted: bool,
    ) -> EngineResult<Vec<ContractInterval>>;

    /// Loads a contract owner.
    fn load_owner(&self, id: OwnerId) -> EngineResult<Option<Owner>>;

    /// Runs `f` as one unit: either every write it makes is kept, or none.
    fn transaction<T, F>(&mut self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Self) -> EngineResult<T>;
}
