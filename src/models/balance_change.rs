//! Balance change models.
//!
//! The ledger is a flat, append-only list of signed [`BalanceChange`]s. Each
//! entry points at the record it belongs to through a weak [`SourceRef`]:
//! an entitlement, or a single day of a leave request.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

numeric_id!(
    /// Identifier of a ledger entry.
    BalanceChangeId
);

/// The kind of record a balance change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A leave-period entitlement.
    Entitlement,
    /// One date of a leave (or TOIL) request.
    LeaveRequestDay,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Entitlement => write!(f, "entitlement"),
            SourceType::LeaveRequestDay => write!(f, "leave_request_day"),
        }
    }
}

/// A typed, weak reference to the owner of a balance change.
///
/// This is a lookup key, not an ownership relation: the referenced record
/// lives elsewhere and the ledger never loads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Kind of the referenced record.
    pub source_type: SourceType,
    /// Identifier of the referenced record.
    pub source_id: u64,
}

impl SourceRef {
    /// Reference to an entitlement.
    pub fn entitlement(id: u64) -> Self {
        Self {
            source_type: SourceType::Entitlement,
            source_id: id,
        }
    }

    /// Reference to a leave request date.
    pub fn leave_request_day(id: u64) -> Self {
        Self {
            source_type: SourceType::LeaveRequestDay,
            source_id: id,
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.source_type, self.source_id)
    }
}

/// The sign an amount must carry for a given [`BalanceChangeType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSign {
    /// Strictly positive.
    Credit,
    /// Strictly negative.
    Debit,
    /// Any non-zero amount.
    Either,
}

/// What a balance change represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceChangeType {
    /// Yearly entitlement grant.
    Entitlement,
    /// Balance carried over from a previous period; may expire.
    BroughtForward,
    /// Public holidays added to the entitlement.
    PublicHoliday,
    /// Manual adjustment of either sign.
    Overridden,
    /// Leave consumption, and the compensating entry written on expiry.
    Debit,
    /// Time off in lieu earned; may expire.
    ToilAccrual,
    /// Time off in lieu taken.
    ToilDebit,
}

impl BalanceChangeType {
    /// The sign amounts of this type must carry.
    pub fn sign(&self) -> AmountSign {
        match self {
            BalanceChangeType::Entitlement
            | BalanceChangeType::BroughtForward
            | BalanceChangeType::PublicHoliday
            | BalanceChangeType::ToilAccrual => AmountSign::Credit,
            BalanceChangeType::Debit | BalanceChangeType::ToilDebit => AmountSign::Debit,
            BalanceChangeType::Overridden => AmountSign::Either,
        }
    }

    /// Whether entries of this type may carry an expiry date.
    pub fn can_expire(&self) -> bool {
        matches!(
            self,
            BalanceChangeType::BroughtForward | BalanceChangeType::ToilAccrual
        )
    }
}

impl std::fmt::Display for BalanceChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BalanceChangeType::Entitlement => "Entitlement",
            BalanceChangeType::BroughtForward => "Brought Forward",
            BalanceChangeType::PublicHoliday => "Public Holiday",
            BalanceChangeType::Overridden => "Overridden",
            BalanceChangeType::Debit => "Debit",
            BalanceChangeType::ToilAccrual => "TOIL Accrual",
            BalanceChangeType::ToilDebit => "TOIL Debit",
        };
        write!(f, "{}", name)
    }
}

/// A balance change that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBalanceChange {
    /// What the change represents.
    pub type_id: BalanceChangeType,
    /// The record the change belongs to.
    pub source: SourceRef,
    /// Signed amount in leave days (negative = consumption).
    pub amount: Decimal,
    /// Date on which the unused part of the amount is forfeited.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// The entry this one forfeits. Only the expiry engine sets it.
    #[serde(default)]
    pub expired_balance_change_id: Option<BalanceChangeId>,
    /// Ledger timestamp.
    pub created_at: NaiveDateTime,
}

impl NewBalanceChange {
    /// Creates an entry without expiry information.
    pub fn new(
        type_id: BalanceChangeType,
        source: SourceRef,
        amount: Decimal,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            type_id,
            source,
            amount,
            expiry_date: None,
            expired_balance_change_id: None,
            created_at,
        }
    }

    /// Sets the expiry date.
    pub fn expiring_on(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }
}

/// A stored ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// Store-assigned identifier.
    pub id: BalanceChangeId,
    /// What the change represents.
    pub type_id: BalanceChangeType,
    /// The record the change belongs to.
    pub source: SourceRef,
    /// Signed amount in leave days (negative = consumption).
    pub amount: Decimal,
    /// Date on which the unused part of the amount is forfeited.
    pub expiry_date: Option<NaiveDate>,
    /// The entry this one forfeits, for compensating entries.
    pub expired_balance_change_id: Option<BalanceChangeId>,
    /// Ledger timestamp.
    pub created_at: NaiveDateTime,
}

impl BalanceChange {
    /// Builds the stored form of `new` under the given id.
    pub fn from_new(id: BalanceChangeId, new: NewBalanceChange) -> Self {
        Self {
            id,
            type_id: new.type_id,
            source: new.source,
            amount: new.amount,
            expiry_date: new.expiry_date,
            expired_balance_change_id: new.expired_balance_change_id,
            created_at: new.created_at,
        }
    }

    /// Whether this entry was written by the expiry engine.
    pub fn is_compensating(&self) -> bool {
        self.expired_balance_change_id.is_some()
    }

    /// The date the entry takes effect.
    pub fn date(&self) -> NaiveDate {
        self.created_at.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_types_require_positive_amounts() {
        for t in [
            BalanceChangeType::Entitlement,
            BalanceChangeType::BroughtForward,
            BalanceChangeType::PublicHoliday,
            BalanceChangeType::ToilAccrual,
        ] {
            assert_eq!(t.sign(), AmountSign::Credit, "{} should be a credit", t);
        }
    }

    #[test]
    fn test_debit_types_require_negative_amounts() {
        assert_eq!(BalanceChangeType::Debit.sign(), AmountSign::Debit);
        assert_eq!(BalanceChangeType::ToilDebit.sign(), AmountSign::Debit);
        assert_eq!(BalanceChangeType::Overridden.sign(), AmountSign::Either);
    }

    #[test]
    fn test_only_brought_forward_and_toil_accrual_expire() {
        assert!(BalanceChangeType::BroughtForward.can_expire());
        assert!(BalanceChangeType::ToilAccrual.can_expire());
        assert!(!BalanceChangeType::Entitlement.can_expire());
        assert!(!BalanceChangeType::Debit.can_expire());
    }

    #[test]
    fn test_source_ref_display() {
        assert_eq!(SourceRef::entitlement(12).to_string(), "entitlement#12");
        assert_eq!(
            SourceRef::leave_request_day(3).to_string(),
            "leave_request_day#3"
        );
    }

    #[test]
    fn test_balance_change_type_serialization() {
        assert_eq!(
            serde_json::to_string(&BalanceChangeType::ToilAccrual).unwrap(),
            "\"toil_accrual\""
        );
        assert_eq!(
            serde_json::to_string(&BalanceChangeType::BroughtForward).unwrap(),
            "\"brought_forward\""
        );
    }

    #[test]
    fn test_deserialize_new_balance_change() {
        let json = r#"{
            "type_id": "brought_forward",
            "source": { "source_type": "entitlement", "source_id": 4 },
            "amount": "5.5",
            "expiry_date": "2016-03-31",
            "created_at": "2016-01-01T00:00:00"
        }"#;

        let change: NewBalanceChange = serde_json::from_str(json).unwrap();
        assert_eq!(change.type_id, BalanceChangeType::BroughtForward);
        assert_eq!(change.source, SourceRef::entitlement(4));
        assert_eq!(change.amount, Decimal::new(55, 1));
        assert_eq!(change.expiry_date, NaiveDate::from_ymd_opt(2016, 3, 31));
        assert!(change.expired_balance_change_id.is_none());
    }

    #[test]
    fn test_compensating_flag_follows_back_reference() {
        let created_at = NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut change = BalanceChange::from_new(
            BalanceChangeId(2),
            NewBalanceChange::new(
                BalanceChangeType::Debit,
                SourceRef::entitlement(1),
                Decimal::new(-3, 0),
                created_at,
            ),
        );
        assert!(!change.is_compensating());

        change.expired_balance_change_id = Some(BalanceChangeId(1));
        assert!(change.is_compensating());
        assert_eq!(change.date(), created_at.date());
    }
}
