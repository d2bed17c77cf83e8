//! Open-interest reconciliation.
//!
//! The API exposes only the current snapshot, so missed hours cannot be
//! re-fetched. Instead, a gap against the last stored sample is bridged
//! with one linearly interpolated synthetic sample per missing hour before
//! the real sample is stored.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use bmd_client::{ClientError, MarketDataSource};
use bmd_core::{datetime_from_ms, hours_between, Asset, OiSource, OpenInterestRecord};
use bmd_store::SeriesStore;
use chrono::Duration;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OiReconcileReport {
    /// Whether the real sample was stored.
    pub stored: bool,
    /// Interpolated rows written alongside it.
    pub interpolated: usize,
}

/// Fetch the current snapshot for one asset, bridge any gap against the
/// last stored sample, and store the result.
///
/// A business or shape failure on the snapshot logs a warning and stores
/// nothing; transport and store failures abort the routine.
pub async fn reconcile_open_interest<S: SeriesStore>(
    source: &dyn MarketDataSource,
    store: &mut S,
    asset: &Asset,
    symbol: &str,
    config: &SyncConfig,
) -> SyncResult<OiReconcileReport> {
    let snapshot = match source.open_interest(symbol).await {
        Ok(snapshot) => snapshot,
        Err(e @ (ClientError::Business { .. } | ClientError::Decode(_))) => {
            warn!(asset = %asset, error = %e, "Open-interest snapshot unavailable, skipping");
            return Ok(OiReconcileReport::default());
        }
        Err(e) => return Err(e.into()),
    };

    // Unit correction is a static per-asset policy, not inferred from the
    // response shape.
    let mut value = snapshot.amount;
    if let Some(divisor) = config.oi_divisor(asset) {
        value /= divisor;
    }
    let value = value.round_dp(config.oi_scale);
    let ts = datetime_from_ms(snapshot.ts_ms)?;

    let mut rows = Vec::new();
    if let Some((last_ts, last_value)) = store.last_open_interest(asset)? {
        let elapsed = hours_between(last_ts, ts);
        // A single missed hour is within clock-drift tolerance; only wider
        // gaps are bridged.
        if elapsed > 1 {
            info!(
                asset = %asset,
                elapsed_hours = elapsed,
                "Open-interest gap detected, interpolating"
            );
            let step = (value - last_value) / Decimal::from(elapsed);
            for i in 1..elapsed {
                rows.push(OpenInterestRecord {
                    asset: asset.clone(),
                    ts: last_ts + Duration::hours(i),
                    open_interest: (last_value + step * Decimal::from(i))
                        .round_dp(config.oi_scale),
                    source: OiSource::Interpolated,
                });
            }
        }
    }

    rows.push(OpenInterestRecord {
        asset: asset.clone(),
        ts,
        open_interest: value,
        source: OiSource::Observed,
    });
    let interpolated = rows.len() - 1;
    store.upsert_open_interest(&rows)?;

    info!(
        asset = %asset,
        value = %value,
        ts = %ts,
        interpolated,
        "Stored open interest"
    );
    Ok(OiReconcileReport {
        stored: true,
        interpolated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmd_client::{MockSource, OpenInterestSnapshot};
    use bmd_core::HOUR_MS;
    use bmd_store::MemoryStore;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    const T0: i64 = 1_700_000_000_000;

    fn btc() -> Asset {
        Asset::new("BTC")
    }

    fn eth() -> Asset {
        Asset::new("ETH")
    }

    fn seed(store: &mut MemoryStore, asset: &Asset, ts_ms: i64, value: Decimal) {
        store
            .upsert_open_interest(&[OpenInterestRecord {
                asset: asset.clone(),
                ts: DateTime::<Utc>::from_timestamp_millis(ts_ms).unwrap(),
                open_interest: value,
                source: OiSource::Observed,
            }])
            .unwrap();
    }

    #[tokio::test]
    async fn test_three_hour_gap_produces_two_interpolated_rows() {
        let source = MockSource::new();
        // ETH: no unit correction, so stored == snapshot.
        source.set_open_interest(Ok(OpenInterestSnapshot {
            ts_ms: T0 + 3 * HOUR_MS,
            amount: dec!(130),
        }));
        let mut store = MemoryStore::new();
        seed(&mut store, &eth(), T0, dec!(100));
        let config = SyncConfig::without_delays();

        let report = reconcile_open_interest(&source, &mut store, &eth(), "ETHUSDT", &config)
            .await
            .unwrap();

        assert_eq!(report.interpolated, 2);
        let rows = store.open_interest_rows(&eth());
        assert_eq!(rows.len(), 4);
        // V0 + (V3-V0)/3 and V0 + 2(V3-V0)/3 at T0+1h and T0+2h.
        assert_eq!(rows[1].ts.timestamp_millis(), T0 + HOUR_MS);
        assert_eq!(rows[1].open_interest, dec!(110));
        assert_eq!(rows[1].source, OiSource::Interpolated);
        assert_eq!(rows[2].ts.timestamp_millis(), T0 + 2 * HOUR_MS);
        assert_eq!(rows[2].open_interest, dec!(120));
        assert_eq!(rows[3].open_interest, dec!(130));
        assert_eq!(rows[3].source, OiSource::Observed);
    }

    #[tokio::test]
    async fn test_interpolated_values_round_to_three_decimals() {
        let source = MockSource::new();
        source.set_open_interest(Ok(OpenInterestSnapshot {
            ts_ms: T0 + 3 * HOUR_MS,
            amount: dec!(1),
        }));
        let mut store = MemoryStore::new();
        seed(&mut store, &eth(), T0, dec!(0));
        let config = SyncConfig::without_delays();

        reconcile_open_interest(&source, &mut store, &eth(), "ETHUSDT", &config)
            .await
            .unwrap();

        let rows = store.open_interest_rows(&eth());
        assert_eq!(rows[1].open_interest, dec!(0.333));
        assert_eq!(rows[2].open_interest, dec!(0.667));
    }

    #[tokio::test]
    async fn test_no_prior_sample_stores_exactly_one_row() {
        let source = MockSource::new();
        source.set_open_interest(Ok(OpenInterestSnapshot {
            ts_ms: T0,
            amount: dec!(500),
        }));
        let mut store = MemoryStore::new();
        let config = SyncConfig::without_delays();

        let report = reconcile_open_interest(&source, &mut store, &eth(), "ETHUSDT", &config)
            .await
            .unwrap();

        assert!(report.stored);
        assert_eq!(report.interpolated, 0);
        assert_eq!(store.open_interest_rows(&eth()).len(), 1);
    }

    #[tokio::test]
    async fn test_one_hour_gap_is_not_interpolated() {
        let source = MockSource::new();
        source.set_open_interest(Ok(OpenInterestSnapshot {
            ts_ms: T0 + HOUR_MS,
            amount: dec!(105),
        }));
        let mut store = MemoryStore::new();
        seed(&mut store, &eth(), T0, dec!(100));
        let config = SyncConfig::without_delays();

        let report = reconcile_open_interest(&source, &mut store, &eth(), "ETHUSDT", &config)
            .await
            .unwrap();

        assert_eq!(report.interpolated, 0);
        assert_eq!(store.open_interest_rows(&eth()).len(), 2);
    }

    #[tokio::test]
    async fn test_btc_value_is_halved_eth_is_not() {
        let config = SyncConfig::without_delays();

        let source = MockSource::new();
        source.set_open_interest(Ok(OpenInterestSnapshot {
            ts_ms: T0,
            amount: dec!(52340.246),
        }));
        let mut store = MemoryStore::new();
        reconcile_open_interest(&source, &mut store, &btc(), "BTCUSDT", &config)
            .await
            .unwrap();
        assert_eq!(store.open_interest_rows(&btc())[0].open_interest, dec!(26170.123));

        let source = MockSource::new();
        source.set_open_interest(Ok(OpenInterestSnapshot {
            ts_ms: T0,
            amount: dec!(812.5),
        }));
        reconcile_open_interest(&source, &mut store, &eth(), "ETHUSDT", &config)
            .await
            .unwrap();
        assert_eq!(store.open_interest_rows(&eth())[0].open_interest, dec!(812.5));
    }

    #[tokio::test]
    async fn test_stored_value_rounds_to_scale() {
        let source = MockSource::new();
        source.set_open_interest(Ok(OpenInterestSnapshot {
            ts_ms: T0,
            amount: dec!(99.12345),
        }));
        let mut store = MemoryStore::new();
        let config = SyncConfig::without_delays();

        reconcile_open_interest(&source, &mut store, &eth(), "ETHUSDT", &config)
            .await
            .unwrap();
        assert_eq!(store.open_interest_rows(&eth())[0].open_interest, dec!(99.123));
    }

    #[tokio::test]
    async fn test_business_failure_skips_quietly() {
        let source = MockSource::new();
        source.set_open_interest(Err(ClientError::Business {
            code: "40808".to_string(),
            message: "symbol offline".to_string(),
        }));
        let mut store = MemoryStore::new();
        let config = SyncConfig::without_delays();

        let report = reconcile_open_interest(&source, &mut store, &btc(), "BTCUSDT", &config)
            .await
            .unwrap();

        assert!(!report.stored);
        assert!(store.open_interest_rows(&btc()).is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_aborts() {
        let source = MockSource::new();
        source.set_open_interest(Err(ClientError::Transport("timeout".to_string())));
        let mut store = MemoryStore::new();
        let config = SyncConfig::without_delays();

        assert!(
            reconcile_open_interest(&source, &mut store, &btc(), "BTCUSDT", &config)
                .await
                .is_err()
        );
    }
}
