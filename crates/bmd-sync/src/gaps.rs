//! Gap-detection diagnostic.
//!
//! Read-only scan of stored timestamps: reports holes without touching the
//! data or the upstream API. Candles tolerate 1.1 h between rows (small
//! drift), open interest 1.5 h; funding settlements are irregular by
//! nature and are not scanned.

use crate::cursor::date_start_ms;
use crate::error::SyncResult;
use bmd_core::{datetime_from_ms, Asset, Series};
use bmd_store::SeriesStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Maximum spacing between candle rows before it counts as a gap.
pub const CANDLE_GAP_TOLERANCE_SECS: i64 = 3_960; // 1.1 h

/// Maximum spacing between open-interest rows before it counts as a gap.
pub const OI_GAP_TOLERANCE_SECS: i64 = 5_400; // 1.5 h

/// One detected hole in a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapEntry {
    pub series: Series,
    /// Last row before the hole, or the configured target start for a
    /// missing head.
    pub start: Option<DateTime<Utc>>,
    /// First row after the hole; `None` means "up to now".
    pub end: Option<DateTime<Utc>>,
    pub description: String,
}

/// Gaps per asset. Assets without findings are omitted.
#[derive(Debug, Default, Serialize)]
pub struct GapReport {
    pub gaps: BTreeMap<String, Vec<GapEntry>>,
}

impl GapReport {
    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Scan stored series for holes.
pub fn scan_gaps<S: SeriesStore>(
    store: &S,
    assets: &[Asset],
    target_start: Option<NaiveDate>,
) -> SyncResult<GapReport> {
    let target_start_dt = match target_start {
        Some(date) => Some(datetime_from_ms(date_start_ms(date))?),
        None => None,
    };

    let mut report = GapReport::default();
    for asset in assets {
        let mut entries = Vec::new();

        let candle_ts = store.series_timestamps(Series::Candles, asset)?;
        match (candle_ts.first(), target_start_dt) {
            (Some(first), Some(target)) if target < *first => {
                entries.push(GapEntry {
                    series: Series::Candles,
                    start: Some(target),
                    end: Some(*first),
                    description: "Missing data before current history".to_string(),
                });
            }
            (None, Some(target)) => {
                entries.push(GapEntry {
                    series: Series::Candles,
                    start: Some(target),
                    end: None,
                    description: "No data found".to_string(),
                });
            }
            _ => {}
        }
        entries.extend(internal_gaps(
            Series::Candles,
            &candle_ts,
            CANDLE_GAP_TOLERANCE_SECS,
        ));

        let oi_ts = store.series_timestamps(Series::OpenInterest, asset)?;
        entries.extend(internal_gaps(
            Series::OpenInterest,
            &oi_ts,
            OI_GAP_TOLERANCE_SECS,
        ));

        if !entries.is_empty() {
            report.gaps.insert(asset.to_string(), entries);
        }
    }
    Ok(report)
}

fn internal_gaps(
    series: Series,
    timestamps: &[DateTime<Utc>],
    tolerance_secs: i64,
) -> Vec<GapEntry> {
    timestamps
        .windows(2)
        .filter_map(|pair| {
            let secs = (pair[1] - pair[0]).num_seconds();
            if secs > tolerance_secs {
                Some(GapEntry {
                    series,
                    start: Some(pair[0]),
                    end: Some(pair[1]),
                    description: format!("Gap of {} hours", secs / 3600),
                })
            } else {
                None
            }
        })
        .collect()
}
