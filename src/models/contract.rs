//! Contract interval models.
//!
//! Each saved version of a contract's details produces a
//! [`ContractInterval`] revision. The newest non-deleted revision of a
//! contract describes its current active period.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

numeric_id!(
    /// Identifier of a contract owner (a contact).
    OwnerId
);

numeric_id!(
    /// Identifier of a logical contract, shared by all of its revisions.
    ContractId
);

numeric_id!(
    /// Identifier of a single contract revision.
    IntervalId
);

/// A person who can hold contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Identifier of the owner.
    pub id: OwnerId,
    /// Name used to order owners in listings.
    pub display_name: String,
}

/// One revision of a contract's active period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInterval {
    /// Identifier of this revision.
    pub id: IntervalId,
    /// The logical contract this revision belongs to.
    pub contract_id: ContractId,
    /// The contract holder.
    pub owner_id: OwnerId,
    /// First day of the contract (inclusive).
    pub period_start: NaiveDate,
    /// Last day of the contract (inclusive); `None` means open-ended.
    pub period_end: Option<NaiveDate>,
    /// Whether the contract has been deleted.
    #[serde(default)]
    pub deleted: bool,
    /// When this revision was saved.
    pub revision: NaiveDateTime,
}

impl ContractInterval {
    /// Checks if the contract is active on `date`.
    ///
    /// Both ends are inclusive and an open end never closes.
    ///
    /// # Example
    ///
    /// ```
    /// use leave_engine::models::{ContractId, ContractInterval, IntervalId, OwnerId};
    /// use chrono::NaiveDate;
    ///
    /// let interval = ContractInterval {
    ///     id: IntervalId(1),
    ///     contract_id: ContractId(1),
    ///     owner_id: OwnerId(1),
    ///     period_start: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
    ///     period_end: None,
    ///     deleted: false,
    ///     revision: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
    /// };
    ///
    /// assert!(interval.contains(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()));
    /// assert!(interval.contains(NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()));
    /// assert!(!interval.contains(NaiveDate::from_ymd_opt(2015, 12, 31).unwrap()));
    /// ```
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.period_start <= date && self.period_end.is_none_or(|end| end >= date)
    }
}
