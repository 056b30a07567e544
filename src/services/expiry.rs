//! Expiry of time-limited credits.
//!
//! Brought-forward balances and TOIL accruals carry an expiry date. Once that
//! date is reached, whatever part of the credit has not been consumed is
//! forfeited by a compensating debit that points back at the credit.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calculation::allocate_consumption;
use crate::error::{EngineError, EngineResult};
use crate::models::{BalanceChange, BalanceChangeType, NewBalanceChange, SourceRef};
use crate::store::LeaveStore;

/// A source the sweep could not process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    /// The source that failed.
    pub source: SourceRef,
    /// Why it failed.
    pub message: String,
}

/// Outcome of [`ExpiryEngine::expire_all`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Compensating entries written, across all sources.
    pub created: Vec<BalanceChange>,
    /// Sources left untouched because their ledger failed integrity checks.
    pub failures: Vec<SweepFailure>,
}

/// Writes compensating entries for expired, unused credits.
///
/// # Example
///
/// ```
/// use leave_engine::models::{BalanceChangeType, NewBalanceChange, SourceRef};
/// use leave_engine::services::{BalanceLedger, ExpiryEngine};
/// use leave_engine::store::InMemoryStore;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let source = SourceRef::entitlement(1);
/// let mut store = InMemoryStore::new();
/// store.register_source(source);
///
/// let jan_1 = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
/// let mar_31 = NaiveDate::from_ymd_opt(2016, 3, 31).unwrap();
/// BalanceLedger::new(&mut store)
///     .record(
///         NewBalanceChange::new(
///             BalanceChangeType::BroughtForward,
///             source,
///             Decimal::new(10, 0),
///             jan_1.and_hms_opt(0, 0, 0).unwrap(),
///         )
///         .expiring_on(mar_31),
///     )
///     .unwrap();
///
/// let mut engine = ExpiryEngine::new(&mut store);
/// let created = engine.expire_as_of(source, mar_31).unwrap();
/// assert_eq!(created.len(), 1);
/// assert_eq!(created[0].amount, Decimal::new(-10, 0));
///
/// // A second pass finds nothing left to expire.
/// assert!(engine.expire_as_of(source, mar_31).unwrap().is_empty());
/// ```
pub struct ExpiryEngine<'a, S: LeaveStore> {
    store: &'a mut S,
}

impl<'a, S: LeaveStore> ExpiryEngine<'a, S> {
    /// Creates an expiry engine over `store`.
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Expires every credit of `source` whose expiry date is on or before
    /// `reference_date`.
    ///
    /// # Returns
    ///
    /// The compensating entries created by this call. Credits that already
    /// have a compensating entry, or that were fully consumed, produce none.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the source does not exist
    /// - `DataIntegrity` if the source's ledger is inconsistent; nothing is
    ///   written in that case
    pub fn expire_as_of(
        &mut self,
        source: SourceRef,
        reference_date: NaiveDate,
    ) -> EngineResult<Vec<BalanceChange>> {
        if !self.store.source_exists(source)? {
            return Err(EngineError::not_found("Source", source));
        }
        self.store
            .transaction(|store| expire_source(store, source, reference_date))
    }

    /// Runs [`expire_as_of`](Self::expire_as_of) over every known source.
    ///
    /// Each source is expired in its own transaction. A source whose ledger
    /// fails integrity checks is reported in [`SweepReport::failures`] and
    /// the sweep moves on.
    pub fn expire_all(&mut self, reference_date: NaiveDate) -> EngineResult<SweepReport> {
        let mut report = SweepReport::default();

        for source in self.store.sources()? {
            match self
                .store
                .transaction(|store| expire_source(store, source, reference_date))
            {
                Ok(mut created) => report.created.append(&mut created),
                Err(err @ EngineError::DataIntegrity { .. }) => {
                    report.failures.push(SweepFailure {
                        source,
                        message: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            reference_date = %reference_date,
            created = report.created.len(),
            failures = report.failures.len(),
            "Finished expiry sweep"
        );
        Ok(report)
    }
}

fn expire_source<S: LeaveStore>(
    store: &mut S,
    source: SourceRef,
    reference_date: NaiveDate,
) -> EngineResult<Vec<BalanceChange>> {
    let entries = store.load_ledger_entries(source)?;
    let allocation = allocate_consumption(&entries).inspect_err(|err| {
        warn!(source = %source, error = %err, "Ledger failed integrity checks");
    })?;

    let mut created = Vec::new();
    for entry in &entries {
        let Some(expiry_date) = entry.expiry_date else {
            continue;
        };
        if !entry.type_id.can_expire() || entry.is_compensating() || expiry_date > reference_date {
            continue;
        }
        if store.find_compensating_entry(entry.id)?.is_some() {
            continue;
        }

        let unused = allocation.unused(entry);
        if unused <= Decimal::ZERO {
            debug!(entry_id = %entry.id, "Credit fully consumed before expiry");
            continue;
        }

        let compensating = NewBalanceChange {
            type_id: BalanceChangeType::Debit,
            source,
            amount: -unused,
            expiry_date: Some(expiry_date),
            expired_balance_change_id: Some(entry.id),
            created_at: expiry_date.and_time(NaiveTime::MIN),
        };
        let id = store.append_ledger_entry(compensating.clone())?;
        info!(
            entry_id = %id,
            expired_entry_id = %entry.id,
            source = %source,
            amount = %compensating.amount,
            "Wrote expiry entry"
        );
        created.push(BalanceChange::from_new(id, compensating));
    }

    Ok(created)
}
