//! Calculation logic for the leave engine.
//!
//! This module contains the pure functions the services are built on:
//! placing a date within a rotating work pattern and converting it into a
//! leave-day fraction, first-in first-out matching of consumption against
//! credits, and the overlap rules used to find active contracts.

mod fifo_allocation;
mod leave_days;
mod period_overlap;

pub use fifo_allocation::{Allocation, allocate_consumption, check_ledger_integrity};
pub use leave_days::{
    RotationAnchor, leave_days_for_date, leave_days_for_period, week_index_for_date,
};
pub use period_overlap::{QueryPeriod, current_revisions};
