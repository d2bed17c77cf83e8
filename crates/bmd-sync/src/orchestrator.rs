//! Cycle orchestration.
//!
//! One cycle walks the tracked assets sequentially and, per asset, runs
//! candle sync, funding sync, and open-interest reconciliation in order.
//! Cursor-resolution reads and the subsequent upserts are not
//! transactionally linked, so at most one cycle may run at a time; a
//! second trigger while one is in flight is rejected, never queued.

use crate::candles::{sync_candles, CandleSyncReport};
use crate::config::SyncConfig;
use crate::cursor::{
    resolve_candle_start, resolve_funding_cutoff, CursorContext, CycleMode,
};
use crate::error::{SyncError, SyncResult};
use crate::funding::{sync_funding, FundingSyncReport};
use crate::open_interest::{reconcile_open_interest, OiReconcileReport};
use bmd_client::DynMarketDataSource;
use bmd_core::{Asset, RunStatus};
use bmd_store::SeriesStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// A trading pair tracked by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSymbol {
    /// Exchange symbol, e.g. "BTCUSDT".
    pub symbol: String,
    /// Derived asset name, e.g. "BTC".
    pub asset: Asset,
}

impl TrackedSymbol {
    /// Build from an exchange symbol and the quote currency.
    pub fn new(symbol: impl Into<String>, quote: &str) -> bmd_core::Result<Self> {
        let symbol = symbol.into();
        let asset = Asset::from_symbol(&symbol, quote)?;
        Ok(Self { symbol, asset })
    }
}

/// Per-asset outcome of one cycle. `None` for a series means it failed;
/// the error text is in `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetReport {
    pub asset: String,
    pub candles: Option<CandleSyncReport>,
    pub funding: Option<FundingSyncReport>,
    pub open_interest: Option<OiReconcileReport>,
    pub errors: Vec<String>,
}

/// Outcome of one full cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub assets: Vec<AssetReport>,
}

impl CycleReport {
    /// True when every series of every asset completed.
    pub fn is_clean(&self) -> bool {
        self.assets.iter().all(|a| a.errors.is_empty())
    }

    fn series_failures(&self) -> usize {
        self.assets.iter().map(|a| a.errors.len()).sum()
    }

    fn rows_upserted(&self) -> usize {
        self.assets
            .iter()
            .map(|a| {
                a.candles.map_or(0, |r| r.rows_upserted)
                    + a.funding.map_or(0, |r| r.rows_upserted)
                    + a.open_interest.map_or(0, |r| r.interpolated + usize::from(r.stored))
            })
            .sum()
    }

    fn summary(&self) -> String {
        format!(
            "mode: {}, assets: {}, rows upserted: {}, series failures: {}",
            self.mode,
            self.assets.len(),
            self.rows_upserted(),
            self.series_failures()
        )
    }
}

/// Releases the in-flight flag on every exit path.
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs collection cycles over a fixed set of tracked symbols.
pub struct CycleRunner {
    source: DynMarketDataSource,
    symbols: Vec<TrackedSymbol>,
    config: SyncConfig,
    in_flight: AtomicBool,
}

impl CycleRunner {
    pub fn new(
        source: DynMarketDataSource,
        symbols: Vec<TrackedSymbol>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            symbols,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one collection cycle.
    ///
    /// Logs STARTED before any work and SUCCESS or ERROR after; a failed
    /// series is recorded in the report and does not stop the remaining
    /// series or assets.
    ///
    /// # Errors
    /// `SyncError::CycleInProgress` when another cycle holds the in-flight
    /// flag; otherwise only failures that escape the per-series guards
    /// (run-log or flush failures).
    pub async fn run_cycle<S: SeriesStore>(
        &self,
        store: &mut S,
        mode: CycleMode,
        explicit_start: Option<NaiveDate>,
    ) -> SyncResult<CycleReport> {
        let _guard =
            CycleGuard::acquire(&self.in_flight).ok_or(SyncError::CycleInProgress)?;

        let start_label = explicit_start
            .map(|d| d.to_string())
            .unwrap_or_else(|| "auto".to_string());
        store.log_run(
            RunStatus::Started,
            &format!("mode: {mode}, start date: {start_label}"),
        )?;

        let result = self.run_assets(store, mode, explicit_start).await;
        match result {
            Ok(report) => {
                let summary = report.summary();
                info!(%summary, "Cycle completed");
                store.log_run(RunStatus::Success, &summary)?;
                store.flush()?;
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Cycle aborted");
                if let Err(log_err) = store.log_run(RunStatus::Error, &e.to_string()) {
                    error!(error = %log_err, "Failed to record cycle error in run log");
                }
                if let Err(flush_err) = store.flush() {
                    error!(error = %flush_err, "Failed to flush store after cycle error");
                }
                Err(e)
            }
        }
    }

    async fn run_assets<S: SeriesStore>(
        &self,
        store: &mut S,
        mode: CycleMode,
        explicit_start: Option<NaiveDate>,
    ) -> SyncResult<CycleReport> {
        let now = Utc::now();
        let end_ms = now.timestamp_millis();
        let ctx = CursorContext {
            mode,
            explicit_start,
            now,
            config: &self.config,
        };

        let mut report = CycleReport {
            mode: mode.to_string(),
            started_at: now,
            assets: Vec::new(),
        };

        for tracked in &self.symbols {
            info!(symbol = %tracked.symbol, asset = %tracked.asset, "Starting collection");
            let mut asset_report = AssetReport {
                asset: tracked.asset.to_string(),
                ..AssetReport::default()
            };

            match self.candle_series(store, tracked, &ctx, end_ms).await {
                Ok(r) => asset_report.candles = Some(r),
                Err(e) => {
                    error!(asset = %tracked.asset, error = %e, "Candle sync failed");
                    asset_report.errors.push(format!("candles: {e}"));
                }
            }

            match self.funding_series(store, tracked, &ctx).await {
                Ok(r) => asset_report.funding = Some(r),
                Err(e) => {
                    error!(asset = %tracked.asset, error = %e, "Funding sync failed");
                    asset_report.errors.push(format!("funding: {e}"));
                }
            }

            match reconcile_open_interest(
                self.source.as_ref(),
                store,
                &tracked.asset,
                &tracked.symbol,
                &self.config,
            )
            .await
            {
                Ok(r) => asset_report.open_interest = Some(r),
                Err(e) => {
                    error!(asset = %tracked.asset, error = %e, "Open-interest reconciliation failed");
                    asset_report.errors.push(format!("open_interest: {e}"));
                }
            }

            report.assets.push(asset_report);
        }

        Ok(report)
    }

    async fn candle_series<S: SeriesStore>(
        &self,
        store: &mut S,
        tracked: &TrackedSymbol,
        ctx: &CursorContext<'_>,
        end_ms: i64,
    ) -> SyncResult<CandleSyncReport> {
        let start_ms = resolve_candle_start(store, &tracked.asset, ctx)?;
        sync_candles(
            self.source.as_ref(),
            store,
            &tracked.asset,
            &tracked.symbol,
            start_ms,
            end_ms,
            &self.config,
        )
        .await
    }

    async fn funding_series<S: SeriesStore>(
        &self,
        store: &mut S,
        tracked: &TrackedSymbol,
        ctx: &CursorContext<'_>,
    ) -> SyncResult<FundingSyncReport> {
        let cutoff_ms = resolve_funding_cutoff(store, &tracked.asset, ctx)?;
        sync_funding(
            self.source.as_ref(),
            store,
            &tracked.asset,
            &tracked.symbol,
            cutoff_ms,
            &self.config,
        )
        .await
    }
}
