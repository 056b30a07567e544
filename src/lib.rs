//! Leave and absence engine
//!
//! This crate converts calendar dates into leave-day fractions under rotating
//! work patterns, keeps an append-only ledger of leave balance changes,
//! forfeits unused time-limited credits once they expire, and answers which
//! contracts and contract holders are active in a period.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
