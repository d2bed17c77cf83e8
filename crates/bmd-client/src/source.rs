//! Market-data source trait for dependency injection.
//!
//! The sync engine is written against this trait so it can be driven by the
//! real `BitgetClient` or by `MockSource` in tests.

use crate::error::{ClientError, ClientResult};
use crate::rest::{BitgetClient, CANDLE_PAGE_LIMIT};
use crate::types::{Candle, FundingEvent, OpenInterestSnapshot};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Read-only market-data capability: candle history, funding history,
/// open-interest snapshot.
pub trait MarketDataSource: Send + Sync {
    /// Candles with timestamps in `[start_ms, end_ms)`, bounded by the
    /// upstream per-request row limit.
    fn candle_history(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> BoxFuture<'_, ClientResult<Vec<Candle>>>;

    /// One page of funding history; page 1 is the most recent.
    fn funding_history(&self, symbol: &str, page_no: u32)
        -> BoxFuture<'_, ClientResult<Vec<FundingEvent>>>;

    /// Current open-interest snapshot.
    fn open_interest(&self, symbol: &str) -> BoxFuture<'_, ClientResult<OpenInterestSnapshot>>;
}

impl MarketDataSource for BitgetClient {
    fn candle_history(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> BoxFuture<'_, ClientResult<Vec<Candle>>> {
        let symbol = symbol.to_string();
        Box::pin(async move { self.fetch_candles(&symbol, start_ms, end_ms).await })
    }

    fn funding_history(
        &self,
        symbol: &str,
        page_no: u32,
    ) -> BoxFuture<'_, ClientResult<Vec<FundingEvent>>> {
        let symbol = symbol.to_string();
        Box::pin(async move { self.fetch_funding_page(&symbol, page_no).await })
    }

    fn open_interest(&self, symbol: &str) -> BoxFuture<'_, ClientResult<OpenInterestSnapshot>> {
        let symbol = symbol.to_string();
        Box::pin(async move { self.fetch_open_interest(&symbol).await })
    }
}

/// Arc wrapper for source trait objects.
pub type DynMarketDataSource = Arc<dyn MarketDataSource>;

/// Scriptable in-memory source for tests.
///
/// Candle requests are served from a fixed series filtered to the requested
/// window (mimicking the row limit), unless a scripted response has been
/// queued. Funding pages and open interest are fully scripted. Every request
/// is recorded for verification.
#[derive(Default)]
pub struct MockSource {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    candles: Vec<Candle>,
    candle_responses: VecDeque<ClientResult<Vec<Candle>>>,
    candle_requests: Vec<(i64, i64)>,
    funding_pages: VecDeque<ClientResult<Vec<FundingEvent>>>,
    funding_requests: Vec<u32>,
    open_interest: Option<ClientResult<OpenInterestSnapshot>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the full candle series served by window filtering.
    pub fn set_candles(&self, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.ts_ms);
        self.state.lock().candles = candles;
    }

    /// Queue an exact response for the next candle request, bypassing the
    /// window filter. Queued responses are consumed in order.
    pub fn push_candle_response(&self, response: ClientResult<Vec<Candle>>) {
        self.state.lock().candle_responses.push_back(response);
    }

    /// Queue the response for the next funding page request.
    pub fn push_funding_page(&self, response: ClientResult<Vec<FundingEvent>>) {
        self.state.lock().funding_pages.push_back(response);
    }

    /// Set the open-interest snapshot response.
    pub fn set_open_interest(&self, response: ClientResult<OpenInterestSnapshot>) {
        self.state.lock().open_interest = Some(response);
    }

    /// Requested candle windows, in order.
    pub fn candle_requests(&self) -> Vec<(i64, i64)> {
        self.state.lock().candle_requests.clone()
    }

    /// Requested funding page numbers, in order.
    pub fn funding_requests(&self) -> Vec<u32> {
        self.state.lock().funding_requests.clone()
    }
}

impl MarketDataSource for MockSource {
    fn candle_history(
        &self,
        _symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> BoxFuture<'_, ClientResult<Vec<Candle>>> {
        let result = {
            let mut state = self.state.lock();
            state.candle_requests.push((start_ms, end_ms));
            match state.candle_responses.pop_front() {
                Some(scripted) => scripted,
                None => Ok(state
                    .candles
                    .iter()
                    .filter(|c| c.ts_ms >= start_ms && c.ts_ms < end_ms)
                    .take(CANDLE_PAGE_LIMIT as usize)
                    .cloned()
                    .collect()),
            }
        };
        Box::pin(async move { result })
    }

    fn funding_history(
        &self,
        _symbol: &str,
        page_no: u32,
    ) -> BoxFuture<'_, ClientResult<Vec<FundingEvent>>> {
        let result = {
            let mut state = self.state.lock();
            state.funding_requests.push(page_no);
            state.funding_pages.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        };
        Box::pin(async move { result })
    }

    fn open_interest(&self, _symbol: &str) -> BoxFuture<'_, ClientResult<OpenInterestSnapshot>> {
        let result = self.state.lock().open_interest.clone().unwrap_or_else(|| {
            Err(ClientError::Decode(
                "mock: no open-interest snapshot scripted".to_string(),
            ))
        });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(ts_ms: i64) -> Candle {
        Candle {
            ts_ms,
            open: dec!(1),
            high: dec!(2),
            low: dec!(0.5),
            close: dec!(1.5),
            volume: dec!(10),
        }
    }

    #[tokio::test]
    async fn test_mock_serves_window() {
        let source = MockSource::new();
        source.set_candles(vec![candle(1000), candle(2000), candle(3000)]);

        let rows = source.candle_history("BTCUSDT", 1000, 3000).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(source.candle_requests(), vec![(1000, 3000)]);
    }

    #[tokio::test]
    async fn test_mock_scripted_response_takes_precedence() {
        let source = MockSource::new();
        source.set_candles(vec![candle(1000)]);
        source.push_candle_response(Err(ClientError::Business {
            code: "40034".to_string(),
            message: "bad param".to_string(),
        }));

        assert!(source.candle_history("BTCUSDT", 0, 5000).await.is_err());
        // Queue drained; next request falls back to the window filter.
        let rows = source.candle_history("BTCUSDT", 0, 5000).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_funding_pages_in_order() {
        let source = MockSource::new();
        source.push_funding_page(Ok(vec![FundingEvent {
            ts_ms: 100,
            rate: dec!(0.0001),
        }]));
        source.push_funding_page(Ok(Vec::new()));

        assert_eq!(source.funding_history("BTCUSDT", 1).await.unwrap().len(), 1);
        assert!(source.funding_history("BTCUSDT", 2).await.unwrap().is_empty());
        assert_eq!(source.funding_requests(), vec![1, 2]);
    }
}
