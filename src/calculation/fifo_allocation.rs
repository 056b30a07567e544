//! First-in, first-out allocation of consumption against credits.
//!
//! Consumption recorded against a source is matched to the credits of that
//! source in ledger order: the oldest open credit is depleted first. This is
//! re-derived from the full entry list on every call; nothing is cached.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AmountSign, BalanceChange, BalanceChangeId};

/// How much of each credit has been drawn by consumption.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    consumed: HashMap<BalanceChangeId, Decimal>,
    unallocated: Decimal,
}

impl Allocation {
    /// Amount drawn against the credit with the given id.
    pub fn consumed_against(&self, id: BalanceChangeId) -> Decimal {
        self.consumed.get(&id).copied().unwrap_or(Decimal::ZERO)
    }

    /// The part of `entry` that no consumption has drawn.
    pub fn unused(&self, entry: &BalanceChange) -> Decimal {
        entry.amount - self.consumed_against(entry.id)
    }

    /// Consumption that no credit could cover.
    pub fn unallocated(&self) -> Decimal {
        self.unallocated
    }
}

struct OpenCredit {
    id: BalanceChangeId,
    remaining: Decimal,
    expiry_date: Option<NaiveDate>,
}

impl OpenCredit {
    /// Credits can be drawn by consumption dated strictly before their expiry.
    fn usable_on(&self, date: NaiveDate) -> bool {
        self.remaining > Decimal::ZERO && self.expiry_date.is_none_or(|expiry| date < expiry)
    }
}

/// Matches every debit of one source against that source's credits.
///
/// # Arguments
///
/// * `entries` - All ledger entries of a single source, in any order
///
/// # Returns
///
/// The per-credit consumption, or a `DataIntegrity` error if the entries
/// fail [`check_ledger_integrity`].
///
/// # Behavior
///
/// - Entries are processed in `(created_at, id)` order
/// - Positive amounts are credits, negative amounts are debits
/// - A debit draws from the oldest credit still open on the debit's date
/// - Debit left uncovered is queued and absorbed by the next credits that
///   are usable on the debit's date
/// - Compensating (expiry) entries take no part in the allocation
///
/// # Example
///
/// ```
/// use leave_engine::calculation::allocate_consumption;
/// use leave_engine::models::{
///     BalanceChange, BalanceChangeId, BalanceChangeType, NewBalanceChange, SourceRef,
/// };
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let at = |d: u32| NaiveDate::from_ymd_opt(2016, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let source = SourceRef::entitlement(1);
/// let entries = vec![
///     BalanceChange::from_new(BalanceChangeId(1), NewBalanceChange::new(
///         BalanceChangeType::BroughtForward, source, Decimal::new(5, 0), at(1))),
///     BalanceChange::from_new(BalanceChangeId(2), NewBalanceChange::new(
///         BalanceChangeType::Entitlement, source, Decimal::new(20, 0), at(1))),
///     BalanceChange::from_new(BalanceChangeId(3), NewBalanceChange::new(
///         BalanceChangeType::Debit, source, Decimal::new(-7, 0), at(10))),
/// ];
///
/// let allocation = allocate_consumption(&entries).unwrap();
/// assert_eq!(allocation.consumed_against(BalanceChangeId(1)), Decimal::new(5, 0));
/// assert_eq!(allocation.consumed_against(BalanceChangeId(2)), Decimal::new(2, 0));
/// ```
pub fn allocate_consumption(entries: &[BalanceChange]) -> EngineResult<Allocation> {
    check_ledger_integrity(entries)?;

    let mut ordered: Vec<&BalanceChange> =
        entries.iter().filter(|e| !e.is_compensating()).collect();
    ordered.sort_by_key(|e| (e.created_at, e.id));

    let mut allocation = Allocation::default();
    let mut open: VecDeque<OpenCredit> = VecDeque::new();
    let mut uncovered: VecDeque<(NaiveDate, Decimal)> = VecDeque::new();

    for entry in ordered {
        if entry.amount > Decimal::ZERO {
            let mut credit = OpenCredit {
                id: entry.id,
                remaining: entry.amount,
                expiry_date: entry.expiry_date,
            };
            let mut drawn = Decimal::ZERO;

            for (date, outstanding) in uncovered.iter_mut() {
                if !credit.usable_on(*date) {
                    continue;
                }
                let take = credit.remaining.min(*outstanding);
                credit.remaining -= take;
                *outstanding -= take;
                drawn += take;
            }
            uncovered.retain(|(_, outstanding)| *outstanding > Decimal::ZERO);

            allocation.consumed.insert(entry.id, drawn);
            open.push_back(credit);
        } else if entry.amount < Decimal::ZERO {
            let date = entry.date();
            let mut needed = -entry.amount;

            for credit in open.iter_mut() {
                if needed == Decimal::ZERO {
                    break;
                }
                if !credit.usable_on(date) {
                    continue;
                }
                let take = credit.remaining.min(needed);
                credit.remaining -= take;
                needed -= take;
                *allocation.consumed.entry(credit.id).or_insert(Decimal::ZERO) += take;
            }
            while open.front().is_some_and(|c| c.remaining == Decimal::ZERO) {
                open.pop_front();
            }

            if needed > Decimal::ZERO {
                uncovered.push_back((date, needed));
            }
        }
    }

    allocation.unallocated = uncovered.iter().map(|(_, amount)| *amount).sum();
    Ok(allocation)
}

/// Verifies that the entries of one source can be allocated safely.
///
/// Fails with `DataIntegrity` when:
/// - entries belong to more than one source
/// - a credit-type entry is not positive, or a debit-type entry not negative
/// - a compensating entry points at a missing entry, at an entry without an
///   expiry date, or at another compensating entry
/// - two compensating entries point at the same entry
pub fn check_ledger_integrity(entries: &[BalanceChange]) -> EngineResult<()> {
    let Some(first) = entries.first() else {
        return Ok(());
    };

    let by_id: HashMap<BalanceChangeId, &BalanceChange> =
        entries.iter().map(|e| (e.id, e)).collect();
    let mut compensated: HashSet<BalanceChangeId> = HashSet::new();

    for entry in entries {
        if entry.source != first.source {
            return Err(EngineError::integrity(format!(
                "entry {} belongs to {} but was loaded with {}",
                entry.id, entry.source, first.source
            )));
        }

        if let Some(target_id) = entry.expired_balance_change_id {
            let target = by_id.get(&target_id).ok_or_else(|| {
                EngineError::integrity(format!(
                    "entry {} expires entry {} which does not exist in {}",
                    entry.id, target_id, entry.source
                ))
            })?;
            if target.is_compensating() {
                return Err(EngineError::integrity(format!(
                    "entry {} expires entry {} which is itself an expiry entry",
                    entry.id, target_id
                )));
            }
            if target.expiry_date.is_none() {
                return Err(EngineError::integrity(format!(
                    "entry {} expires entry {} which has no expiry date",
                    entry.id, target_id
                )));
            }
            if !compensated.insert(target_id) {
                return Err(EngineError::integrity(format!(
                    "entry {} has more than one expiry entry",
                    target_id
                )));
            }
            if entry.amount > Decimal::ZERO {
                return Err(EngineError::integrity(format!(
                    "expiry entry {} has a positive amount {}",
                    entry.id, entry.amount
                )));
            }
            continue;
        }

        match entry.type_id.sign() {
            AmountSign::Credit if entry.amount <= Decimal::ZERO => {
                return Err(EngineError::integrity(format!(
                    "{} entry {} has a non-positive amount {}",
                    entry.type_id, entry.id, entry.amount
                )));
            }
            AmountSign::Debit if entry.amount >= Decimal::ZERO => {
                return Err(EngineError::integrity(format!(
                    "{} entry {} has a non-negative amount {}",
                    entry.type_id, entry.id, entry.amount
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BalanceChangeType, NewBalanceChange, SourceRef};
    use chrono::NaiveDateTime;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn make_datetime(date_str: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} 00:00:00", date_str), "%Y-%m-%d %H:%M:%S")
            .unwrap()
    }

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn entry(id: u64, type_id: BalanceChangeType, amount: &str, at: &str) -> BalanceChange {
        BalanceChange::from_new(
            BalanceChangeId(id),
            NewBalanceChange::new(
                type_id,
                SourceRef::entitlement(1),
                dec(amount),
                make_datetime(at),
            ),
        )
    }

    fn expiring(
        id: u64,
        type_id: BalanceChangeType,
        amount: &str,
        at: &str,
        expiry: &str,
    ) -> BalanceChange {
        let mut e = entry(id, type_id, amount, at);
        e.expiry_date = Some(make_date(expiry));
        e
    }

    fn expiry_of(id: u64, target: u64, amount: &str, at: &str) -> BalanceChange {
        let mut e = entry(id, BalanceChangeType::Debit, amount, at);
        e.expired_balance_change_id = Some(BalanceChangeId(target));
        e.expiry_date = Some(make_date(at));
        e
    }

    #[test]
    fn test_empty_ledger_allocates_nothing() {
        let allocation = allocate_consumption(&[]).unwrap();
        assert_eq!(allocation.unallocated(), Decimal::ZERO);
        assert_eq!(allocation.consumed_against(BalanceChangeId(1)), Decimal::ZERO);
    }

    #[test]
    fn test_oldest_credit_is_depleted_first() {
        let entries = vec![
            expiring(1, BalanceChangeType::BroughtForward, "5", "2016-01-01", "2016-04-01"),
            entry(2, BalanceChangeType::Entitlement, "20", "2016-01-02"),
            entry(3, BalanceChangeType::Debit, "-3", "2016-02-01"),
            entry(4, BalanceChangeType::Debit, "-4", "2016-02-10"),
        ];

        let allocation = allocate_consumption(&entries).unwrap();
        assert_eq!(allocation.consumed_against(BalanceChangeId(1)), dec("5"));
        assert_eq!(allocation.consumed_against(BalanceChangeId(2)), dec("2"));
        assert_eq!(allocation.unused(&entries[0]), Decimal::ZERO);
        assert_eq!(allocation.unused(&entries[1]), dec("18"));
    }

    #[test]
    fn test_same_timestamp_orders_by_id() {
        let entries = vec![
            entry(2, BalanceChangeType::Entitlement, "20", "2016-01-01"),
            expiring(1, BalanceChangeType::BroughtForward, "5", "2016-01-01", "2016-04-01"),
            entry(3, BalanceChangeType::Debit, "-1", "2016-02-01"),
        ];

        let allocation = allocate_consumption(&entries).unwrap();
        assert_eq!(allocation.consumed_against(BalanceChangeId(1)), dec("1"));
        assert_eq!(allocation.consumed_against(BalanceChangeId(2)), Decimal::ZERO);
    }

    #[test]
    fn test_debit_on_or_after_expiry_skips_expired_credit() {
        let entries = vec![
            expiring(1, BalanceChangeType::BroughtForward, "5", "2016-01-01", "2016-04-01"),
            entry(2, BalanceChangeType::Entitlement, "20", "2016-01-02"),
            entry(3, BalanceChangeType::Debit, "-2", "2016-04-01"),
        ];

        let allocation = allocate_consumption(&entries).unwrap();
        assert_eq!(allocation.consumed_against(BalanceChangeId(1)), Decimal::ZERO);
        assert_eq!(allocation.consumed_against(BalanceChangeId(2)), dec("2"));
    }

    #[test]
    fn test_uncovered_debit_is_absorbed_by_later_credit() {
        let entries = vec![
            entry(1, BalanceChangeType::Debit, "-2", "2016-01-05"),
            expiring(2, BalanceChangeType::ToilAccrual, "3", "2016-01-10", "2016-06-01"),
        ];

        let allocation = allocate_consumption(&entries).unwrap();
        assert_eq!(allocation.consumed_against(BalanceChangeId(2)), dec("2"));
        assert_eq!(allocation.unallocated(), Decimal::ZERO);
    }

    #[test]
    fn test_overdraft_is_reported_as_unallocated() {
        let entries = vec![
            entry(1, BalanceChangeType::Entitlement, "1", "2016-01-01"),
            entry(2, BalanceChangeType::Debit, "-3", "2016-01-05"),
        ];

        let allocation = allocate_consumption(&entries).unwrap();
        assert_eq!(allocation.consumed_against(BalanceChangeId(1)), dec("1"));
        assert_eq!(allocation.unallocated(), dec("2"));
    }

    #[test]
    fn test_overridden_entries_follow_their_sign() {
        let entries = vec![
            entry(1, BalanceChangeType::Overridden, "4", "2016-01-01"),
            entry(2, BalanceChangeType::Overridden, "-1.5", "2016-01-03"),
        ];

        let allocation = allocate_consumption(&entries).unwrap();
        assert_eq!(allocation.consumed_against(BalanceChangeId(1)), dec("1.5"));
    }

    #[test]
    fn test_compensating_entries_do_not_consume() {
        let entries = vec![
            expiring(1, BalanceChangeType::BroughtForward, "5", "2016-01-01", "2016-04-01"),
            expiry_of(2, 1, "-5", "2016-04-01"),
            entry(3, BalanceChangeType::Entitlement, "10", "2016-01-01"),
        ];

        let allocation = allocate_consumption(&entries).unwrap();
        assert_eq!(allocation.consumed_against(BalanceChangeId(1)), Decimal::ZERO);
        assert_eq!(allocation.consumed_against(BalanceChangeId(3)), Decimal::ZERO);
    }

    // ==========================================================================
    // Integrity checks
    // ==========================================================================

    #[test]
    fn test_negative_brought_forward_is_an_integrity_error() {
        let entries = vec![expiring(
            1,
            BalanceChangeType::BroughtForward,
            "-5",
            "2016-01-01",
            "2016-04-01",
        )];

        let result = allocate_consumption(&entries);
        assert!(matches!(result, Err(EngineError::DataIntegrity { .. })));
    }

    #[test]
    fn test_positive_debit_is_an_integrity_error() {
        let entries = vec![entry(1, BalanceChangeType::Debit, "2", "2016-01-01")];
        assert!(matches!(
            check_ledger_integrity(&entries),
            Err(EngineError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_broken_back_reference_is_an_integrity_error() {
        let entries = vec![
            entry(1, BalanceChangeType::Entitlement, "10", "2016-01-01"),
            expiry_of(2, 99, "-1", "2016-04-01"),
        ];

        match check_ledger_integrity(&entries) {
            Err(EngineError::DataIntegrity { message }) => {
                assert!(message.contains("does not exist"), "{}", message);
            }
            other => panic!("Expected DataIntegrity error, got {:?}", other),
        }
    }

    #[test]
    fn test_back_reference_to_entry_without_expiry_is_an_integrity_error() {
        let entries = vec![
            entry(1, BalanceChangeType::Entitlement, "10", "2016-01-01"),
            expiry_of(2, 1, "-10", "2016-04-01"),
        ];
        assert!(check_ledger_integrity(&entries).is_err());
    }

    #[test]
    fn test_chained_expiry_is_an_integrity_error() {
        let entries = vec![
            expiring(1, BalanceChangeType::BroughtForward, "5", "2016-01-01", "2016-04-01"),
            expiry_of(2, 1, "-5", "2016-04-01"),
            expiry_of(3, 2, "-5", "2016-04-01"),
        ];
        assert!(check_ledger_integrity(&entries).is_err());
    }

    #[test]
    fn test_duplicate_expiry_is_an_integrity_error() {
        let entries = vec![
            expiring(1, BalanceChangeType::BroughtForward, "5", "2016-01-01", "2016-04-01"),
            expiry_of(2, 1, "-5", "2016-04-01"),
            expiry_of(3, 1, "-5", "2016-04-02"),
        ];

        match check_ledger_integrity(&entries) {
            Err(EngineError::DataIntegrity { message }) => {
                assert!(message.contains("more than one"), "{}", message);
            }
            other => panic!("Expected DataIntegrity error, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_sources_are_an_integrity_error() {
        let mut other = entry(2, BalanceChangeType::Entitlement, "1", "2016-01-01");
        other.source = SourceRef::entitlement(2);
        let entries = vec![
            entry(1, BalanceChangeType::Entitlement, "1", "2016-01-01"),
            other,
        ];
        assert!(check_ledger_integrity(&entries).is_err());
    }
}
