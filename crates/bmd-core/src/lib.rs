//! Core domain types for the Bitget market-data collector.
//!
//! This crate provides the fundamental types shared by the client, store,
//! and sync engine:
//! - `Asset`: tracked symbol identifier derived from a trading pair
//! - `CandleRecord`, `FundingRecord`, `OpenInterestRecord`: persisted series rows
//! - `Series`, `RunStatus`, `RunLogEntry`: store bookkeeping
//! - Epoch-millisecond / `DateTime<Utc>` conversion helpers

pub mod asset;
pub mod error;
pub mod records;
pub mod time;

pub use asset::Asset;
pub use error::{CoreError, Result};
pub use records::{
    CandleRecord, FundingRecord, OiSource, OpenInterestRecord, RunLogEntry, RunStatus, Series,
};
pub use time::{datetime_from_ms, hours_between, HOUR_MS};
