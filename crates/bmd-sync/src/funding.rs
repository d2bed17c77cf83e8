//! Funding-rate synchronization.
//!
//! Funding history is backward-paginated: page 1 holds the most recent
//! settlements. The walk stops once it reaches a settlement at or before
//! the cutoff (exclusive: the boundary row is already stored), or when a
//! page comes back short, the end-of-history signal.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use bmd_client::MarketDataSource;
use bmd_core::{datetime_from_ms, Asset, FundingRecord};
use bmd_store::SeriesStore;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of one funding sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FundingSyncReport {
    /// Pages fetched successfully.
    pub pages: u32,
    /// Rows upserted.
    pub rows_upserted: usize,
}

/// Sync funding settlements newer than `cutoff_ms` for one asset.
///
/// Business failures terminate the walk; transport, decode, and store
/// failures abort the routine.
pub async fn sync_funding<S: SeriesStore>(
    source: &dyn MarketDataSource,
    store: &mut S,
    asset: &Asset,
    symbol: &str,
    cutoff_ms: i64,
    config: &SyncConfig,
) -> SyncResult<FundingSyncReport> {
    let mut report = FundingSyncReport::default();
    let mut page: u32 = 1;

    info!(asset = %asset, cutoff_ms, "Syncing funding history");

    loop {
        let events = match source.funding_history(symbol, page).await {
            Ok(events) => events,
            Err(e) if e.is_business() => {
                warn!(asset = %asset, page, error = %e, "Funding page failed, stopping");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        report.pages += 1;

        if events.is_empty() {
            debug!(asset = %asset, page, "Empty funding page, stopping");
            break;
        }

        let full_page = events.len() >= config.funding_page_size;
        let mut reached_cutoff = false;
        let mut records = Vec::new();
        for event in &events {
            // Exclusive cutoff: the boundary settlement is already stored.
            if event.ts_ms <= cutoff_ms {
                reached_cutoff = true;
                continue;
            }
            match datetime_from_ms(event.ts_ms) {
                Ok(ts) => records.push(FundingRecord {
                    asset: asset.clone(),
                    ts,
                    funding_rate: event.rate,
                }),
                Err(e) => warn!(error = %e, "Skipping funding settlement with unrepresentable timestamp"),
            }
        }

        if !records.is_empty() {
            report.rows_upserted += store.upsert_funding(&records)?;
        }

        if reached_cutoff {
            debug!(asset = %asset, page, "Reached already-synced history");
            break;
        }
        if !full_page {
            debug!(asset = %asset, page, rows = events.len(), "Short page, end of history");
            break;
        }

        page += 1;
        tokio::time::sleep(config.request_delay()).await;
    }

    info!(
        asset = %asset,
        pages = report.pages,
        rows = report.rows_upserted,
        "Funding sync finished"
    );
    Ok(report)
}
