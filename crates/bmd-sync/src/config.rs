//! Sync engine configuration.

use bmd_core::{Asset, HOUR_MS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Tuning knobs for the sync routines.
///
/// Page sizes default to the upstream API limits; lookbacks default to the
/// values the cursor-resolution precedence expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Candle window per request, in hours (the API returns at most 200
    /// hourly rows per call).
    #[serde(default = "default_candle_page_hours")]
    pub candle_page_hours: i64,
    /// Funding rows per page; a shorter page signals end of history.
    #[serde(default = "default_funding_page_size")]
    pub funding_page_size: usize,
    /// Pacing delay between successive requests (ms).
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Delay after a business failure before the next request (ms).
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Lookback for full-range (initial) collection, in days.
    #[serde(default = "default_initial_lookback_days")]
    pub initial_lookback_days: i64,
    /// Candle fallback lookback in update mode, in hours.
    #[serde(default = "default_candle_update_lookback_hours")]
    pub candle_update_lookback_hours: i64,
    /// Funding fallback lookback in update mode, in days.
    #[serde(default = "default_funding_fallback_days")]
    pub funding_fallback_days: i64,
    /// Decimal places stored for open interest.
    #[serde(default = "default_oi_scale")]
    pub oi_scale: u32,
    /// Per-asset open-interest unit correction. Assets listed here report a
    /// multi-sided aggregate; the stored value is the upstream value divided
    /// by the entry. Assets not listed are stored unmodified.
    #[serde(default = "default_oi_unit_divisors")]
    pub oi_unit_divisors: HashMap<String, Decimal>,
}

fn default_candle_page_hours() -> i64 {
    200
}

fn default_funding_page_size() -> usize {
    100
}

fn default_request_delay_ms() -> u64 {
    100
}

fn default_error_backoff_ms() -> u64 {
    1_000
}

fn default_initial_lookback_days() -> i64 {
    90
}

fn default_candle_update_lookback_hours() -> i64 {
    5
}

fn default_funding_fallback_days() -> i64 {
    1
}

fn default_oi_scale() -> u32 {
    3
}

fn default_oi_unit_divisors() -> HashMap<String, Decimal> {
    // Bitget reports BTC open interest as a two-sided aggregate
    // (long + short); halving matches the single-sided convention.
    HashMap::from([("BTC".to_string(), Decimal::TWO)])
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            candle_page_hours: default_candle_page_hours(),
            funding_page_size: default_funding_page_size(),
            request_delay_ms: default_request_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            initial_lookback_days: default_initial_lookback_days(),
            candle_update_lookback_hours: default_candle_update_lookback_hours(),
            funding_fallback_days: default_funding_fallback_days(),
            oi_scale: default_oi_scale(),
            oi_unit_divisors: default_oi_unit_divisors(),
        }
    }
}

impl SyncConfig {
    /// Candle window per request, in milliseconds.
    pub fn candle_page_span_ms(&self) -> i64 {
        self.candle_page_hours * HOUR_MS
    }

    /// Pacing delay between requests.
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Backoff after a business failure.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Unit-correction divisor for an asset, if one is configured.
    pub fn oi_divisor(&self, asset: &Asset) -> Option<Decimal> {
        self.oi_unit_divisors.get(asset.as_str()).copied()
    }

    /// Config with no pacing delays, for tests.
    pub fn without_delays() -> Self {
        Self {
            request_delay_ms: 0,
            error_backoff_ms: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_match_api_limits() {
        let config = SyncConfig::default();
        assert_eq!(config.candle_page_hours, 200);
        assert_eq!(config.funding_page_size, 100);
        assert_eq!(config.candle_page_span_ms(), 200 * 60 * 60 * 1000);
    }

    #[test]
    fn test_btc_divisor_default() {
        let config = SyncConfig::default();
        assert_eq!(config.oi_divisor(&Asset::new("BTC")), Some(dec!(2)));
        assert_eq!(config.oi_divisor(&Asset::new("ETH")), None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str("").unwrap();
        assert_eq!(config.initial_lookback_days, 90);
        assert_eq!(config.candle_update_lookback_hours, 5);
        assert_eq!(config.funding_fallback_days, 1);
        assert_eq!(config.oi_scale, 3);
    }
}
