//! Core data models for the leave engine.
//!
//! This module contains the domain models shared by the calendar, the
//! ledger, the expiry engine and the contract index.

/// Declares a copyable numeric identifier that serializes as a bare number.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

mod balance_change;
mod contract;
mod work_pattern;

pub use balance_change::{
    AmountSign, BalanceChange, BalanceChangeId, BalanceChangeType, NewBalanceChange, SourceRef,
    SourceType,
};
pub use contract::{ContractId, ContractInterval, IntervalId, Owner, OwnerId};
pub use work_pattern::{
    PatternId, WorkDay, WorkDayType, WorkPattern, WorkPatternDraft, WorkPatternUpdate, WorkWeek,
};
