//! HTTP API module for the leave engine.
//!
//! This module exposes the work pattern calendar, the balance ledger, the
//! expiry engine and the contract index as JSON endpoints.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    BalanceChangeRequest, BalanceQuery, ContactsQuery, ContractsQuery, CountQuery, ExpireRequest,
    LeaveDaysRequest, LeaveDaysTarget,
};
pub use response::{ApiError, BalanceResponse, ContactsCountResponse, LeaveDaysResponse};
pub use state::AppState;
