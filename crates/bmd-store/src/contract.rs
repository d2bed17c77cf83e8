//! The store contract the sync engine is written against.
//!
//! All upserts are idempotent on (asset, timestamp): re-writing a row that
//! already exists replaces it and changes nothing else. That contract is
//! what makes re-running a sync over an overlapping window a no-op.

use crate::error::StoreResult;
use bmd_core::{
    Asset, CandleRecord, FundingRecord, OpenInterestRecord, RunLogEntry, RunStatus, Series,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Keyed series storage plus run-log and settings access.
pub trait SeriesStore {
    /// Insert-or-replace candle rows keyed by (asset, ts).
    fn upsert_candles(&mut self, rows: &[CandleRecord]) -> StoreResult<usize>;

    /// Insert-or-replace funding rows keyed by (asset, ts).
    fn upsert_funding(&mut self, rows: &[FundingRecord]) -> StoreResult<usize>;

    /// Insert-or-replace open-interest rows keyed by (asset, ts).
    fn upsert_open_interest(&mut self, rows: &[OpenInterestRecord]) -> StoreResult<usize>;

    /// Latest stored timestamp for (series, asset), if any.
    fn last_timestamp(&self, series: Series, asset: &Asset)
        -> StoreResult<Option<DateTime<Utc>>>;

    /// Latest stored open-interest sample for the asset, if any.
    fn last_open_interest(&self, asset: &Asset)
        -> StoreResult<Option<(DateTime<Utc>, Decimal)>>;

    /// All stored timestamps for (series, asset) in ascending order.
    fn series_timestamps(&self, series: Series, asset: &Asset)
        -> StoreResult<Vec<DateTime<Utc>>>;

    /// Append an entry to the run log.
    fn log_run(&mut self, status: RunStatus, message: &str) -> StoreResult<()>;

    /// Most recent run-log entry, if any.
    fn last_run(&self) -> StoreResult<Option<RunLogEntry>>;

    /// Read an operator setting.
    fn get_setting(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write an operator setting (insert-or-replace).
    fn set_setting(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Persist any buffered state.
    fn flush(&mut self) -> StoreResult<()>;
}
