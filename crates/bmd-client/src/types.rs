//! Wire types and response normalization.
//!
//! Every endpoint returns a `{code, msg, data}` envelope; `code == "00000"`
//! signals business success regardless of HTTP status. Raw shapes are
//! normalized here, at the client boundary, into one canonical type per
//! endpoint so the sync engine never sees upstream shape drift.

use crate::error::{ClientError, ClientResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

/// Business success sentinel in the response envelope.
pub const SUCCESS_CODE: &str = "00000";

/// Response envelope common to all endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, mapping a non-success code to
    /// `ClientError::Business`.
    pub fn into_data(self) -> ClientResult<T> {
        self.check_code()?
            .ok_or_else(|| ClientError::Decode("missing data in successful response".to_string()))
    }

    /// Like `into_data`, but a missing payload becomes `T::default()`.
    ///
    /// List endpoints may answer a successful request with no data at all;
    /// callers treat that the same as an empty page.
    pub fn into_data_or_default(self) -> ClientResult<T>
    where
        T: Default,
    {
        Ok(self.check_code()?.unwrap_or_default())
    }

    fn check_code(self) -> ClientResult<Option<T>> {
        if self.code != SUCCESS_CODE {
            return Err(ClientError::Business {
                code: self.code,
                message: self.msg,
            });
        }
        Ok(self.data)
    }
}

/// One hourly candle, normalized. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candle {
    pub ts_ms: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// One funding-rate settlement, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingEvent {
    pub ts_ms: i64,
    pub rate: Decimal,
}

/// Canonical open-interest snapshot, normalized from either upstream shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenInterestSnapshot {
    pub ts_ms: i64,
    pub amount: Decimal,
}

/// Candle rows arrive as arrays of strings:
/// `[ts, open, high, low, close, baseVolume, ...]`.
///
/// Malformed rows are skipped with a warning; one bad row must not poison
/// a page of good ones.
pub fn parse_candles(rows: Vec<Vec<String>>) -> Vec<Candle> {
    rows.iter()
        .filter_map(|row| match parse_candle_row(row) {
            Some(candle) => Some(candle),
            None => {
                warn!(?row, "Skipping malformed candle row");
                None
            }
        })
        .collect()
}

fn parse_candle_row(row: &[String]) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }
    Some(Candle {
        ts_ms: row[0].parse().ok()?,
        open: row[1].parse().ok()?,
        high: row[2].parse().ok()?,
        low: row[3].parse().ok()?,
        close: row[4].parse().ok()?,
        volume: row[5].parse().ok()?,
    })
}

/// Raw funding-history entry.
#[derive(Debug, Deserialize)]
pub struct RawFundingEntry {
    #[serde(rename = "fundingRate")]
    pub funding_rate: String,
    #[serde(rename = "fundingTime")]
    pub funding_time: String,
}

/// Normalize a funding page, skipping malformed entries with a warning.
pub fn parse_funding(entries: Vec<RawFundingEntry>) -> Vec<FundingEvent> {
    entries
        .iter()
        .filter_map(|entry| {
            let ts_ms = entry.funding_time.parse().ok();
            let rate = entry.funding_rate.parse().ok();
            match (ts_ms, rate) {
                (Some(ts_ms), Some(rate)) => Some(FundingEvent { ts_ms, rate }),
                _ => {
                    warn!(
                        funding_time = %entry.funding_time,
                        funding_rate = %entry.funding_rate,
                        "Skipping malformed funding entry"
                    );
                    None
                }
            }
        })
        .collect()
}

/// The open-interest endpoint answers with either a wrapped list or a flat
/// object depending on upstream version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawOpenInterest {
    Wrapped {
        #[serde(rename = "openInterestList")]
        open_interest_list: Vec<RawOiEntry>,
        #[serde(default)]
        ts: Option<String>,
    },
    Flat(RawOiEntry),
}

/// One raw open-interest item; field names vary across shapes.
#[derive(Debug, Deserialize)]
pub struct RawOiEntry {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Collapse either raw shape into one canonical snapshot.
///
/// Timestamp fallback chain: item `timestamp`, item `time`, wrapper `ts`,
/// then `now_ms`. A missing or unparseable magnitude falls back to zero,
/// the one shape failure with an explicitly safe default.
///
/// # Errors
/// Returns `ClientError::Decode` when the wrapped list is empty; there is
/// nothing to normalize.
pub fn normalize_open_interest(
    raw: RawOpenInterest,
    now_ms: i64,
) -> ClientResult<OpenInterestSnapshot> {
    let (entry, wrapper_ts) = match raw {
        RawOpenInterest::Wrapped {
            mut open_interest_list,
            ts,
        } => {
            if open_interest_list.is_empty() {
                return Err(ClientError::Decode(
                    "open-interest list is empty".to_string(),
                ));
            }
            (open_interest_list.remove(0), ts)
        }
        RawOpenInterest::Flat(entry) => (entry, None),
    };

    let ts_ms = [&entry.timestamp, &entry.time, &wrapper_ts]
        .into_iter()
        .flatten()
        .find_map(|s| s.parse::<i64>().ok())
        .unwrap_or(now_ms);

    let amount = [&entry.amount, &entry.size]
        .into_iter()
        .flatten()
        .find_map(|s| s.parse::<Decimal>().ok())
        .unwrap_or_else(|| {
            warn!("Open-interest magnitude missing or unparseable, defaulting to zero");
            Decimal::ZERO
        });

    Ok(OpenInterestSnapshot { ts_ms, amount })
}
