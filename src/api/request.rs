//! Request types for the leave engine API.
//!
//! This module defines the JSON bodies and query strings the handlers accept.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{BalanceChangeType, NewBalanceChange, SourceRef, SourceType};

/// Request body for `POST /work-patterns/:id/leave-days`.
///
/// Give either `date` for a single day, or `from` and `to` for a range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveDaysRequest {
    /// First day the pattern applies (inclusive).
    pub reference_start: NaiveDate,
    /// Last day the pattern applies (inclusive).
    pub reference_end: NaiveDate,
    /// A single date to look up.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Start of a date range (inclusive).
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// End of a date range (inclusive).
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

/// What a [`LeaveDaysRequest`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDaysTarget {
    /// One date.
    Date(NaiveDate),
    /// An inclusive range.
    Period(NaiveDate, NaiveDate),
}

impl LeaveDaysRequest {
    /// Resolves the requested date or range.
    pub fn target(&self) -> EngineResult<LeaveDaysTarget> {
        match (self.date, self.from, self.to) {
            (Some(date), None, None) => Ok(LeaveDaysTarget::Date(date)),
            (None, Some(from), Some(to)) => Ok(LeaveDaysTarget::Period(from, to)),
            (Some(_), _, _) => Err(EngineError::validation(
                "date",
                "give either date or from/to, not both",
            )),
            (None, None, None) => Err(EngineError::validation(
                "date",
                "either date or from/to is required",
            )),
            (None, Some(_), None) => Err(EngineError::validation("to", "required with from")),
            (None, None, Some(_)) => Err(EngineError::validation("from", "required with to")),
        }
    }
}

/// Request body for `POST /balance-changes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceChangeRequest {
    /// What the change represents.
    pub type_id: BalanceChangeType,
    /// Kind of the owning record.
    pub source_type: SourceType,
    /// Identifier of the owning record.
    pub source_id: u64,
    /// Signed amount in leave days.
    pub amount: Decimal,
    /// Expiry date, for brought-forward and TOIL accrual entries.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Back-reference to a forfeited entry. Always rejected; accepted here
    /// so the ledger can report it by name.
    #[serde(default)]
    pub expired_balance_change_id: Option<crate::models::BalanceChangeId>,
    /// Ledger timestamp; defaults to the time of the request.
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl BalanceChangeRequest {
    /// Converts the request into a ledger entry stamped `now` unless the
    /// request carries its own timestamp.
    pub fn into_balance_change(self, now: NaiveDateTime) -> NewBalanceChange {
        NewBalanceChange {
            type_id: self.type_id,
            source: SourceRef {
                source_type: self.source_type,
                source_id: self.source_id,
            },
            amount: self.amount,
            expiry_date: self.expiry_date,
            expired_balance_change_id: self.expired_balance_change_id,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

/// Query string for `GET /balances/:source_type/:source_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceQuery {
    /// Balance date; defaults to today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Request body for the expiry endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpireRequest {
    /// Credits expiring on or before this date are processed.
    pub reference_date: NaiveDate,
}

/// Query string for `GET /contracts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsQuery {
    /// Lower bound of the period.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Upper bound of the period.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    /// Restrict to one owner.
    #[serde(default)]
    pub owner: Option<u64>,
}

/// Query string for `GET /contacts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactsQuery {
    /// Lower bound of the period.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Upper bound of the period.
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

/// Query string for `GET /contacts/count`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountQuery {
    /// Count date; defaults to today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}
