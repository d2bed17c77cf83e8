//! Candle synchronization.
//!
//! Walks `[start_ms, end_ms)` in fixed-span chunks bounded by the API's
//! per-request row limit. The cursor advances from the last row actually
//! returned, never from the requested window end, and is forced forward by
//! a full span when upstream hands back stale or duplicate data; the loop
//! must make progress on every iteration.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use bmd_client::{Candle, MarketDataSource};
use bmd_core::{datetime_from_ms, Asset, CandleRecord, HOUR_MS};
use bmd_store::SeriesStore;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of one candle sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CandleSyncReport {
    /// Chunk requests issued.
    pub chunks: u32,
    /// Chunks skipped after a business failure.
    pub chunks_skipped: u32,
    /// Rows upserted.
    pub rows_upserted: usize,
}

/// Sync candles for one asset over `[start_ms, end_ms)`.
///
/// Business failures skip the failing chunk with forced cursor advancement;
/// transport, decode, and store failures abort the routine.
pub async fn sync_candles<S: SeriesStore>(
    source: &dyn MarketDataSource,
    store: &mut S,
    asset: &Asset,
    symbol: &str,
    start_ms: i64,
    end_ms: i64,
    config: &SyncConfig,
) -> SyncResult<CandleSyncReport> {
    let span_ms = config.candle_page_span_ms();
    let mut cursor = start_ms;
    let mut report = CandleSyncReport::default();

    info!(asset = %asset, start_ms, end_ms, "Syncing candles");

    while cursor < end_ms {
        let chunk_end = (cursor + span_ms).min(end_ms);
        report.chunks += 1;

        let mut rows = match source.candle_history(symbol, cursor, chunk_end).await {
            Ok(rows) => rows,
            Err(e) if e.is_business() => {
                warn!(
                    asset = %asset,
                    chunk_start = cursor,
                    chunk_end,
                    error = %e,
                    "Candle chunk failed, skipping"
                );
                report.chunks_skipped += 1;
                cursor = chunk_end;
                tokio::time::sleep(config.error_backoff()).await;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if rows.is_empty() {
            debug!(asset = %asset, chunk_start = cursor, chunk_end, "No candles in chunk");
            cursor = chunk_end;
            tokio::time::sleep(config.request_delay()).await;
            continue;
        }

        // Upstream row order is not guaranteed.
        rows.sort_by_key(|c| c.ts_ms);

        let records = to_records(asset, &rows);
        if !records.is_empty() {
            report.rows_upserted += store.upsert_candles(&records)?;
        }

        let last_ts = rows[rows.len() - 1].ts_ms;
        let mut next = last_ts + HOUR_MS;
        if next <= cursor {
            // Stale or duplicate data; a full span forward keeps the loop live.
            warn!(asset = %asset, cursor, last_ts, "Cursor did not advance, forcing a full span");
            next = cursor + span_ms;
        }
        cursor = next;
        tokio::time::sleep(config.request_delay()).await;
    }

    info!(
        asset = %asset,
        chunks = report.chunks,
        rows = report.rows_upserted,
        skipped = report.chunks_skipped,
        "Candle sync finished"
    );
    Ok(report)
}

fn to_records(asset: &Asset, rows: &[Candle]) -> Vec<CandleRecord> {
    rows.iter()
        .filter_map(|c| match datetime_from_ms(c.ts_ms) {
            Ok(ts) => Some(CandleRecord {
                asset: asset.clone(),
                ts,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            }),
            Err(e) => {
                warn!(error = %e, "Skipping candle with unrepresentable timestamp");
                None
            }
        })
        .collect()
}
