//! Starting-point resolution for each (asset, series) pair.
//!
//! Pure functions of store state plus configuration: the caller supplies
//! `now`, so resolution is deterministic and side-effect-free. Precedence:
//! full-range mode uses the explicit start date or the fixed lookback;
//! update mode resumes after the last stored row, then falls back to the
//! operator's `target_start_date` setting, then to a short per-series
//! default lookback.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use bmd_core::{Asset, Series, HOUR_MS};
use bmd_store::SeriesStore;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::fmt;
use tracing::{debug, warn};

/// Settings key holding the operator-configured start date (`YYYY-MM-DD`).
pub const TARGET_START_DATE_KEY: &str = "target_start_date";

/// Collection mode for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// Full-range collection from the configured lookback or an explicit
    /// start date, ignoring store state.
    Initial,
    /// Incremental collection resuming from stored cursors.
    Update,
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// Inputs shared by every cursor resolution in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct CursorContext<'a> {
    pub mode: CycleMode,
    pub explicit_start: Option<NaiveDate>,
    pub now: DateTime<Utc>,
    pub config: &'a SyncConfig,
}

impl CursorContext<'_> {
    fn full_range_start_ms(&self) -> i64 {
        match self.explicit_start {
            Some(date) => date_start_ms(date),
            None => (self.now - Duration::days(self.config.initial_lookback_days))
                .timestamp_millis(),
        }
    }
}

/// Resolve the candle sync start (inclusive, epoch ms).
pub fn resolve_candle_start<S: SeriesStore>(
    store: &S,
    asset: &Asset,
    ctx: &CursorContext<'_>,
) -> SyncResult<i64> {
    if ctx.mode == CycleMode::Initial {
        return Ok(ctx.full_range_start_ms());
    }
    if let Some(last) = store.last_timestamp(Series::Candles, asset)? {
        debug!(asset = %asset, %last, "Resuming candles after last stored row");
        return Ok(last.timestamp_millis() + HOUR_MS);
    }
    if let Some(ms) = configured_target_start(store)? {
        return Ok(ms);
    }
    Ok((ctx.now - Duration::hours(ctx.config.candle_update_lookback_hours)).timestamp_millis())
}

/// Resolve the funding cutoff (exclusive, epoch ms): rows at or before it
/// are already known.
pub fn resolve_funding_cutoff<S: SeriesStore>(
    store: &S,
    asset: &Asset,
    ctx: &CursorContext<'_>,
) -> SyncResult<i64> {
    if ctx.mode == CycleMode::Initial {
        return Ok(ctx.full_range_start_ms());
    }
    if let Some(last) = store.last_timestamp(Series::Funding, asset)? {
        debug!(asset = %asset, %last, "Funding cutoff from last stored settlement");
        return Ok(last.timestamp_millis());
    }
    if let Some(ms) = configured_target_start(store)? {
        return Ok(ms);
    }
    Ok((ctx.now - Duration::days(ctx.config.funding_fallback_days)).timestamp_millis())
}

fn configured_target_start<S: SeriesStore>(store: &S) -> SyncResult<Option<i64>> {
    let Some(raw) = store.get_setting(TARGET_START_DATE_KEY)? else {
        return Ok(None);
    };
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Ok(Some(date_start_ms(date))),
        Err(_) => {
            warn!(value = %raw, "Ignoring unparseable {TARGET_START_DATE_KEY} setting");
            Ok(None)
        }
    }
}

/// Midnight UTC of the given date, in epoch ms.
pub fn date_start_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
