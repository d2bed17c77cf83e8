//! JSON-file store backend.
//!
//! Series tables are held in memory and written whole to one JSON file per
//! series on `flush()` (write-to-temp then rename, so a crash mid-write
//! cannot truncate existing data). The run log is JSON Lines in append
//! mode: each line is a complete entry, and a partial write only affects
//! that line.

use crate::contract::SeriesStore;
use crate::error::StoreResult;
use crate::tables::SeriesTables;
use bmd_core::{
    Asset, CandleRecord, FundingRecord, OpenInterestRecord, RunLogEntry, RunStatus, Series,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CANDLES_FILE: &str = "candles.json";
const FUNDING_FILE: &str = "funding.json";
const OPEN_INTEREST_FILE: &str = "open_interest.json";
const SETTINGS_FILE: &str = "settings.json";
const RUN_LOG_FILE: &str = "runs.jsonl";

/// Durable `SeriesStore` backed by JSON files in one directory.
pub struct JsonFileStore {
    dir: PathBuf,
    tables: SeriesTables,
    settings: HashMap<String, String>,
    last_run: Option<RunLogEntry>,
    dirty: bool,
}

impl JsonFileStore {
    /// Open (or create) a store directory and load existing state.
    ///
    /// # Errors
    /// Fails on IO errors or corrupt JSON; a corrupt table must never be
    /// silently replaced by an empty one on the next flush.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut tables = SeriesTables::default();
        for row in load_rows::<CandleRecord>(&dir.join(CANDLES_FILE))? {
            tables.candles.insert((row.asset.clone(), row.ts), row);
        }
        for row in load_rows::<FundingRecord>(&dir.join(FUNDING_FILE))? {
            tables.funding.insert((row.asset.clone(), row.ts), row);
        }
        for row in load_rows::<OpenInterestRecord>(&dir.join(OPEN_INTEREST_FILE))? {
            tables.open_interest.insert((row.asset.clone(), row.ts), row);
        }

        let settings_path = dir.join(SETTINGS_FILE);
        let settings = if settings_path.exists() {
            serde_json::from_reader(BufReader::new(File::open(&settings_path)?))?
        } else {
            HashMap::new()
        };

        let last_run = read_last_run(&dir.join(RUN_LOG_FILE))?;

        info!(
            dir = %dir.display(),
            candles = tables.candles.len(),
            funding = tables.funding.len(),
            open_interest = tables.open_interest.len(),
            "Opened JSON store"
        );

        Ok(Self {
            dir,
            tables,
            settings,
            last_run,
            dirty: false,
        })
    }

    fn save(&self) -> StoreResult<()> {
        write_rows(
            &self.dir.join(CANDLES_FILE),
            self.tables.candles.values().collect::<Vec<_>>(),
        )?;
        write_rows(
            &self.dir.join(FUNDING_FILE),
            self.tables.funding.values().collect::<Vec<_>>(),
        )?;
        write_rows(
            &self.dir.join(OPEN_INTEREST_FILE),
            self.tables.open_interest.values().collect::<Vec<_>>(),
        )?;
        write_rows(&self.dir.join(SETTINGS_FILE), &self.settings)?;
        debug!(dir = %self.dir.display(), "Flushed store tables");
        Ok(())
    }
}

fn load_rows<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
}

/// Write via a temp file and rename so existing data survives a crash
/// mid-write.
fn write_rows<T: Serialize>(path: &Path, value: T) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &value)?;
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn read_last_run(path: &Path) -> StoreResult<Option<RunLogEntry>> {
    if !path.exists() {
        return Ok(None);
    }
    let reader = BufReader::new(File::open(path)?);
    let mut last = None;
    for line in reader.lines() {
        let line = line?;
        match serde_json::from_str::<RunLogEntry>(&line) {
            Ok(entry) => last = Some(entry),
            Err(e) => warn!(%e, "Skipping unreadable run-log line"),
        }
    }
    Ok(last)
}

impl SeriesStore for JsonFileStore {
    fn upsert_candles(&mut self, rows: &[CandleRecord]) -> StoreResult<usize> {
        let written = self.tables.upsert_candles(rows);
        self.dirty = true;
        Ok(written)
    }

    fn upsert_funding(&mut self, rows: &[FundingRecord]) -> StoreResult<usize> {
        let written = self.tables.upsert_funding(rows);
        self.dirty = true;
        Ok(written)
    }

    fn upsert_open_interest(&mut self, rows: &[OpenInterestRecord]) -> StoreResult<usize> {
        let written = self.tables.upsert_open_interest(rows);
        self.dirty = true;
        Ok(written)
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
        let entry = RunLogEntry {
            executed_at: Utc::now(),
            status,
            message: message.to_string(),
        };
        // Append immediately; the run log must survive even if the cycle
        // dies before the next flush.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(RUN_LOG_FILE))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
        writer.flush()?;
        self.last_run = Some(entry);
        Ok(())
    }

    fn last_run(&self) -> StoreResult<Option<RunLogEntry>> {
        Ok(self.last_run.clone())
    }

    fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.settings.get(key).cloned())
    }

    fn set_setting(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.settings.insert(key.to_string(), value.to_string());
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.save()?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(%e, "Failed to flush store on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmd_core::OiSource;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn btc() -> Asset {
        Asset::new("BTC")
    }

    fn candle(ts: &str, close: Decimal) -> CandleRecord {
        CandleRecord {
            asset: btc(),
            ts: ts.parse().unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1),
        }
    }

    #[test]
    fn test_reopen_roundtrip() {
        let dir = TempDir::new().unwrap();

        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store
                .upsert_candles(&[
                    candle("2024-01-01T00:00:00Z", dec!(100)),
                    candle("2024-01-01T01:00:00Z", dec!(101)),
                ])
                .unwrap();
            store
                .upsert_open_interest(&[OpenInterestRecord {
                    asset: btc(),
                    ts: "2024-01-01T00:00:00Z".parse().unwrap(),
                    open_interest: dec!(42.001),
                    source: OiSource::Interpolated,
                }])
                .unwrap();
            store.set_setting("target_start_date", "2024-01-01").unwrap();
            store.flush().unwrap();
        }

        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(
            store.last_timestamp(Series::Candles, &btc()).unwrap(),
            Some("2024-01-01T01:00:00Z".parse().unwrap())
        );
        let (_, value) = store.last_open_interest(&btc()).unwrap().unwrap();
        assert_eq!(value, dec!(42.001));
        assert_eq!(
            store.get_setting("target_start_date").unwrap().as_deref(),
            Some("2024-01-01")
        );
    }

    #[test]
    fn test_reupsert_after_reopen_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let row = candle("2024-01-01T00:00:00Z", dec!(100));

        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store.upsert_candles(&[row.clone()]).unwrap();
            store.flush().unwrap();
        }
        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store.upsert_candles(&[row.clone()]).unwrap();
            store.flush().unwrap();
        }

        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(
            store.series_timestamps(Series::Candles, &btc()).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_run_log_appends_across_reopens() {
        let dir = TempDir::new().unwrap();

        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store.log_run(RunStatus::Started, "first").unwrap();
            store.log_run(RunStatus::Success, "first done").unwrap();
        }
        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            assert_eq!(store.last_run().unwrap().unwrap().message, "first done");
            store.log_run(RunStatus::Started, "second").unwrap();
        }

        let raw = std::fs::read_to_string(dir.path().join(RUN_LOG_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 3);
    }

    #[test]
    fn test_flush_on_drop() {
        let dir = TempDir::new().unwrap();

        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store
                .upsert_candles(&[candle("2024-01-01T00:00:00Z", dec!(1))])
                .unwrap();
            // No explicit flush; Drop must persist.
        }

        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store
            .last_timestamp(Series::Candles, &btc())
            .unwrap()
            .is_some());
    }
}
