//! Persisted series records and run-log types.
//!
//! All numeric market-data fields use `rust_decimal::Decimal`; repeated
//! upserts of the same row must be byte-stable, which rules out
//! floating-point drift.

use crate::asset::Asset;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three persisted data series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Candles,
    Funding,
    OpenInterest,
}

impl Series {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Candles => "candles",
            Self::Funding => "funding",
            Self::OpenInterest => "open_interest",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hourly OHLCV candle. Primary key: (asset, ts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleRecord {
    pub asset: Asset,
    pub ts: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// One funding-rate settlement. Primary key: (asset, ts).
///
/// Settlement times are exchange-reported and not necessarily hourly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRecord {
    pub asset: Asset,
    pub ts: DateTime<Utc>,
    pub funding_rate: Decimal,
}

/// Provenance of an open-interest sample.
///
/// Interpolated rows are synthesized to bridge gaps between API snapshots;
/// the distinction is persisted so future anchoring policies and
/// diagnostics can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OiSource {
    /// Returned by the exchange API.
    #[default]
    Observed,
    /// Synthesized by gap interpolation.
    Interpolated,
}

/// One open-interest sample. Primary key: (asset, ts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInterestRecord {
    pub asset: Asset,
    pub ts: DateTime<Utc>,
    pub open_interest: Decimal,
    #[serde(default)]
    pub source: OiSource,
}

/// Status of an orchestration cycle in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Started,
    Success,
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("STARTED"),
            Self::Success => f.write_str("SUCCESS"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Append-only audit entry for one orchestration cycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub executed_at: DateTime<Utc>,
    pub status: RunStatus,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Started.to_string(), "STARTED");
        assert_eq!(RunStatus::Success.to_string(), "SUCCESS");
        assert_eq!(RunStatus::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_oi_source_defaults_to_observed() {
        // Rows persisted before the provenance field existed must still load.
        let json = r#"{
            "asset": "BTC",
            "ts": "2024-01-01T00:00:00Z",
            "open_interest": "123.456"
        }"#;
        let record: OpenInterestRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.source, OiSource::Observed);
        assert_eq!(record.open_interest, dec!(123.456));
    }

    #[test]
    fn test_candle_record_roundtrip() {
        let record = CandleRecord {
            asset: Asset::new("ETH"),
            ts: "2024-03-01T12:00:00Z".parse().unwrap(),
            open: dec!(3000.5),
            high: dec!(3050),
            low: dec!(2990.25),
            close: dec!(3020),
            volume: dec!(1234.5678),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: CandleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
