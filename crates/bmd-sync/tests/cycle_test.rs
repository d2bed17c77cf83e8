//! Integration tests for full collection cycles: run-log bookkeeping,
//! per-series failure isolation, resume-from-cursor behavior, and the
//! single-cycle mutual-exclusion guard.

use bmd_client::{
    BoxFuture, Candle, ClientError, ClientResult, FundingEvent, MarketDataSource, MockSource,
    OpenInterestSnapshot,
};
use bmd_core::{Asset, RunStatus, Series, HOUR_MS};
use bmd_store::{MemoryStore, SeriesStore};
use bmd_sync::{CycleMode, CycleRunner, SyncConfig, TrackedSymbol};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

fn hour_floor_ms() -> i64 {
    let now_ms = Utc::now().timestamp_millis();
    now_ms - now_ms.rem_euclid(HOUR_MS)
}

fn candle(ts_ms: i64) -> Candle {
    Candle {
        ts_ms,
        open: dec!(100),
        high: dec!(110),
        low: dec!(90),
        close: dec!(105),
        volume: dec!(7.5),
    }
}

/// Mock serving recent data for one symbol: candles for three hours ending
/// two hours ago, one short funding page, one open-interest snapshot.
fn recent_source(oi_amount: rust_decimal::Decimal) -> MockSource {
    let top = hour_floor_ms();
    let source = MockSource::new();
    source.set_candles((2..5).rev().map(|i| candle(top - i * HOUR_MS)).collect());
    source.push_funding_page(Ok(vec![
        FundingEvent {
            ts_ms: top - 2 * HOUR_MS,
            rate: dec!(0.0001),
        },
        FundingEvent {
            ts_ms: top - 10 * HOUR_MS,
            rate: dec!(0.0002),
        },
    ]));
    source.set_open_interest(Ok(OpenInterestSnapshot {
        ts_ms: top,
        amount: oi_amount,
    }));
    source
}

fn runner(source: MockSource) -> (CycleRunner, Arc<MockSource>) {
    let source = Arc::new(source);
    let runner = CycleRunner::new(
        source.clone(),
        vec![TrackedSymbol::new("BTCUSDT", "USDT").unwrap()],
        SyncConfig::without_delays(),
    );
    (runner, source)
}

#[tokio::test]
async fn test_update_cycle_populates_all_series_and_logs() {
    let (runner, _source) = runner(recent_source(dec!(1000)));
    let mut store = MemoryStore::new();

    let report = runner
        .run_cycle(&mut store, CycleMode::Update, None)
        .await
        .unwrap();

    assert!(report.is_clean());
    let btc = Asset::new("BTC");
    assert_eq!(store.candle_rows(&btc).len(), 3);
    // Both settlements are newer than the 1-day fallback cutoff.
    assert_eq!(store.funding_rows(&btc).len(), 2);
    // BTC open interest is halved by the default unit-correction table.
    let oi = store.open_interest_rows(&btc);
    assert_eq!(oi.len(), 1);
    assert_eq!(oi[0].open_interest, dec!(500));

    let log = store.run_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].status, RunStatus::Started);
    assert!(log[0].message.contains("mode: update"));
    assert_eq!(log[1].status, RunStatus::Success);
}

#[tokio::test]
async fn test_second_update_cycle_resumes_after_stored_rows() {
    let (first_runner, _first_source) = runner(recent_source(dec!(1000)));
    let mut store = MemoryStore::new();

    first_runner
        .run_cycle(&mut store, CycleMode::Update, None)
        .await
        .unwrap();
    let btc = Asset::new("BTC");
    let first_rows = store.candle_rows(&btc);
    let last_ts = store
        .last_timestamp(Series::Candles, &btc)
        .unwrap()
        .unwrap();

    // Second cycle: same scripted upstream, fresh funding page.
    let (second_runner, second_source) = runner(recent_source(dec!(1000)));
    let report = second_runner
        .run_cycle(&mut store, CycleMode::Update, None)
        .await
        .unwrap();
    assert!(report.is_clean());

    // Candle cursor resumed just after the last stored row, and the rows
    // in the already-covered range are unchanged.
    assert_eq!(
        second_source.candle_requests()[0].0,
        last_ts.timestamp_millis() + HOUR_MS
    );
    assert_eq!(store.candle_rows(&btc), first_rows);
}

#[tokio::test]
async fn test_series_failure_is_isolated() {
    let top = hour_floor_ms();
    let source = MockSource::new();
    source.set_candles(vec![candle(top)]);
    source.push_funding_page(Ok(vec![FundingEvent {
        ts_ms: top,
        rate: dec!(0.0001),
    }]));
    // Open interest dies on transport; candles and funding must still land.
    source.set_open_interest(Err(ClientError::Transport("timeout".to_string())));

    let (runner, _source) = runner(source);
    let mut store = MemoryStore::new();

    let report = runner
        .run_cycle(&mut store, CycleMode::Update, None)
        .await
        .unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.assets[0].errors.len(), 1);
    assert!(report.assets[0].errors[0].starts_with("open_interest:"));

    let btc = Asset::new("BTC");
    assert!(!store.candle_rows(&btc).is_empty());
    assert!(!store.funding_rows(&btc).is_empty());
    assert!(store.open_interest_rows(&btc).is_empty());

    // The cycle itself still completes and is logged as SUCCESS; the
    // failure is scoped to one series.
    assert_eq!(store.run_log().last().unwrap().status, RunStatus::Success);
    assert!(store.run_log().last().unwrap().message.contains("series failures: 1"));
}

#[tokio::test]
async fn test_initial_cycle_starts_from_explicit_date() {
    let source = Arc::new(MockSource::new());
    let runner = CycleRunner::new(
        source.clone(),
        vec![TrackedSymbol::new("ETHUSDT", "USDT").unwrap()],
        SyncConfig::without_delays(),
    );
    let mut store = MemoryStore::new();

    let start_date = (Utc::now() - Duration::days(2)).date_naive();
    runner
        .run_cycle(&mut store, CycleMode::Initial, Some(start_date))
        .await
        .unwrap();

    let expected_start_ms = start_date
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis();
    assert_eq!(source.candle_requests()[0].0, expected_start_ms);
}

/// Source that blocks inside the first candle request until released, and
/// signals entry so the test knows the cycle is in flight.
struct StallingSource {
    entered: mpsc::UnboundedSender<()>,
    gate: Arc<Notify>,
}

impl MarketDataSource for StallingSource {
    fn candle_history(
        &self,
        _symbol: &str,
        _start_ms: i64,
        _end_ms: i64,
    ) -> BoxFuture<'_, ClientResult<Vec<Candle>>> {
        let gate = self.gate.clone();
        let _ = self.entered.send(());
        Box::pin(async move {
            gate.notified().await;
            Ok(Vec::new())
        })
    }

    fn funding_history(
        &self,
        _symbol: &str,
        _page_no: u32,
    ) -> BoxFuture<'_, ClientResult<Vec<FundingEvent>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn open_interest(&self, _symbol: &str) -> BoxFuture<'_, ClientResult<OpenInterestSnapshot>> {
        Box::pin(async {
            Err(ClientError::Decode("no snapshot".to_string()))
        })
    }
}

#[tokio::test]
async fn test_concurrent_cycle_is_rejected() {
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let gate = Arc::new(Notify::new());
    let runner = Arc::new(CycleRunner::new(
        Arc::new(StallingSource {
            entered: entered_tx,
            gate: gate.clone(),
        }),
        vec![TrackedSymbol::new("BTCUSDT", "USDT").unwrap()],
        SyncConfig::without_delays(),
    ));

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move {
            let mut store = MemoryStore::new();
            runner.run_cycle(&mut store, CycleMode::Update, None).await
        })
    };

    // Wait until the first cycle is provably inside its candle request.
    entered_rx.recv().await.unwrap();

    let mut store = MemoryStore::new();
    let second = runner.run_cycle(&mut store, CycleMode::Update, None).await;
    assert!(matches!(second, Err(bmd_sync::SyncError::CycleInProgress)));

    // Release the first cycle; once it finishes the guard is free again.
    gate.notify_one();
    assert!(first.await.unwrap().is_ok());

    // Pre-store a permit so the third cycle's candle request passes the gate.
    gate.notify_one();
    let third = runner.run_cycle(&mut store, CycleMode::Update, None).await;
    assert!(third.is_ok());
}
