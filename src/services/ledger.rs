//! The append-only balance ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{AmountSign, BalanceChange, NewBalanceChange, SourceRef};
use crate::store::LeaveStore;

/// Records balance changes and answers balance queries.
///
/// Entries are never updated or removed once recorded.
///
/// # Example
///
/// ```
/// use leave_engine::models::{BalanceChangeType, NewBalanceChange, SourceRef};
/// use leave_engine::services::BalanceLedger;
/// use leave_engine::store::InMemoryStore;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let source = SourceRef::entitlement(1);
/// let mut store = InMemoryStore::new();
/// store.register_source(source);
///
/// let jan_1 = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
/// let mut ledger = BalanceLedger::new(&mut store);
/// ledger
///     .record(NewBalanceChange::new(
///         BalanceChangeType::Entitlement,
///         source,
///         Decimal::new(20, 0),
///         jan_1.and_hms_opt(0, 0, 0).unwrap(),
///     ))
///     .unwrap();
///
/// assert_eq!(ledger.current_balance(source, jan_1).unwrap(), Decimal::new(20, 0));
/// ```
pub struct BalanceLedger<'a, S: LeaveStore> {
    store: &'a mut S,
}

impl<'a, S: LeaveStore> BalanceLedger<'a, S> {
    /// Creates a ledger over `store`.
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Appends a balance change.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the source does not exist
    /// - `Validation` if the amount is zero or its sign does not match the
    ///   type, if an expiry date is set on a type that cannot expire, or if
    ///   `expired_balance_change_id` is set (only the expiry engine writes it)
    pub fn record(&mut self, entry: NewBalanceChange) -> EngineResult<BalanceChange> {
        self.store.transaction(|store| {
            validate_entry(&entry).inspect_err(|err| {
                warn!(source = %entry.source, error = %err, "Rejected balance change");
            })?;
            if !store.source_exists(entry.source)? {
                return Err(EngineError::not_found("Source", entry.source));
            }

            let id = store.append_ledger_entry(entry.clone())?;
            let recorded = BalanceChange::from_new(id, entry);
            info!(
                entry_id = %recorded.id,
                source = %recorded.source,
                type_id = %recorded.type_id,
                amount = %recorded.amount,
                "Recorded balance change"
            );
            Ok(recorded)
        })
    }

    /// Sum of every entry of `source` recorded on or before `as_of`.
    pub fn current_balance(&self, source: SourceRef, as_of: NaiveDate) -> EngineResult<Decimal> {
        Ok(self
            .entries_for_source(source)?
            .iter()
            .filter(|e| e.date() <= as_of)
            .map(|e| e.amount)
            .sum())
    }

    /// All entries of `source` in ledger order.
    pub fn entries_for_source(&self, source: SourceRef) -> EngineResult<Vec<BalanceChange>> {
        if !self.store.source_exists(source)? {
            return Err(EngineError::not_found("Source", source));
        }
        self.store.load_ledger_entries(source)
    }
}

fn validate_entry(entry: &NewBalanceChange) -> EngineResult<()> {
    if entry.expired_balance_change_id.is_some() {
        return Err(EngineError::validation(
            "expired_balance_change_id",
            "is set by the expiry engine only",
        ));
    }

    let sign_ok = match entry.type_id.sign() {
        AmountSign::Credit => entry.amount > Decimal::ZERO,
        AmountSign::Debit => entry.amount < Decimal::ZERO,
        AmountSign::Either => entry.amount != Decimal::ZERO,
    };
    if !sign_ok {
        let expected = match entry.type_id.sign() {
            AmountSign::Credit => "positive",
            AmountSign::Debit => "negative",
            AmountSign::Either => "non-zero",
        };
        return Err(EngineError::validation(
            "amount",
            format!("{} entries must be {}, got {}", entry.type_id, expected, entry.amount),
        ));
    }

    if entry.expiry_date.is_some() && !entry.type_id.can_expire() {
        return Err(EngineError::validation(
            "expiry_date",
            format!("{} entries cannot expire", entry.type_id),
        ));
    }

    Ok(())
}
