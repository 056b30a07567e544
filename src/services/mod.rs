//! The four engine components, wired to a [`LeaveStore`](crate::store::LeaveStore).
//!
//! Each service borrows a store for the duration of one request. Writes go
//! through [`LeaveStore::transaction`](crate::store::LeaveStore::transaction),
//! so a failed operation leaves nothing behind.

mod contracts;
mod expiry;
mod ledger;
mod work_patterns;

pub use contracts::IntervalIndex;
pub use expiry::{ExpiryEngine, SweepFailure, SweepReport};
pub use ledger::BalanceLedger;
pub use work_patterns::{PatternSummary, PatternWeeksAndHours, WorkPatternCalendar};
