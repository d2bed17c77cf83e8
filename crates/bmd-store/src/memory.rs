//! In-memory store for tests and dry runs.

use crate::contract::SeriesStore;
use crate::error::StoreResult;
use crate::tables::SeriesTables;
use bmd_core::{
    Asset, CandleRecord, FundingRecord, OpenInterestRecord, RunLogEntry, RunStatus, Series,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Volatile `SeriesStore` implementation. Nothing survives drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: SeriesTables,
    run_log: Vec<RunLogEntry>,
    settings: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All candle rows for an asset in timestamp order (test helper).
    pub fn candle_rows(&self, asset: &Asset) -> Vec<CandleRecord> {
        self.tables
            .candles
            .values()
            .filter(|r| &r.asset == asset)
            .cloned()
            .collect()
    }

    /// All funding rows for an asset in timestamp order (test helper).
    pub fn funding_rows(&self, asset: &Asset) -> Vec<FundingRecord> {
        self.tables
            .funding
            .values()
            .filter(|r| &r.asset == asset)
            .cloned()
            .collect()
    }

    /// All open-interest rows for an asset in timestamp order (test helper).
    pub fn open_interest_rows(&self, asset: &Asset) -> Vec<OpenInterestRecord> {
        self.tables
            .open_interest
            .values()
            .filter(|r| &r.asset == asset)
            .cloned()
            .collect()
    }

    /// Full run log in append order (test helper).
    pub fn run_log(&self) -> &[RunLogEntry] {
        &self.run_log
    }
}

impl SeriesStore for MemoryStore {
    fn upsert_candles(&mut self, rows: &[CandleRecord]) -> StoreResult<usize> {
        Ok(self.tables.upsert_candles(rows))
    }

    fn upsert_funding(&mut self, rows: &[FundingRecord]) -> StoreResult<usize> {
        Ok(self.tables.upsert_funding(rows))
    }

    fn upsert_open_interest(&mut self, rows: &[OpenInterestRecord]) -> StoreResult<usize> {
        Ok(self.tables.upsert_open_interest(rows))
    }

    fn last_timestamp(
        &self,
        series: Series,
        asset: &Asset,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.tables.last_timestamp(series, asset))
    }

    fn last_open_interest(
        &self,
        asset: &Asset,
    ) -> StoreResult<Option<(DateTime<Utc>, Decimal)>> {
        Ok(self.tables.last_open_interest(asset))
    }

    fn series_timestamps(
        &self,
        series: Series,
        asset: &Asset,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        Ok(self.tables.series_timestamps(series, asset))
    }

    fn log_run(&mut self, status: RunStatus, message: &str) -> StoreResult<()> {
        self.run_log.push(RunLogEntry {
            executed_at: Utc::now(),
            status,
            message: message.to_string(),
        });
        Ok(())
    }

    fn last_run(&self) -> StoreResult<Option<RunLogEntry>> {
        Ok(self.run_log.last().cloned())
    }

    fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.settings.get(key).cloned())
    }

    fn set_setting(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        Ok(())
    }
}
