//! HTTP client for the Bitget mix-market endpoints.
//!
//! Three read-only endpoints: candle history, funding-rate history, and the
//! current open-interest snapshot. Requests are signed when credentials are
//! present; market data also works unsigned. The client fails closed on
//! non-2xx status or malformed JSON and performs no retries; skip/retry
//! policy belongs to the sync engine.

use crate::error::{ClientError, ClientResult};
use crate::sign::Credentials;
use crate::types::{
    normalize_open_interest, parse_candles, parse_funding, ApiEnvelope, Candle, FundingEvent,
    OpenInterestSnapshot, RawFundingEntry, RawOpenInterest,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Production API host.
pub const DEFAULT_HOST: &str = "https://api.bitget.com";

/// Product type for USDT-margined perpetual futures.
pub const DEFAULT_PRODUCT_TYPE: &str = "usdt-futures";

/// Candle granularity requested from the history endpoint.
const CANDLE_GRANULARITY: &str = "1H";

/// Maximum candle rows per request.
pub const CANDLE_PAGE_LIMIT: u32 = 200;

/// Funding-history rows per page.
pub const FUNDING_PAGE_SIZE: u32 = 100;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CANDLES_ENDPOINT: &str = "/api/v2/mix/market/history-candles";
const FUNDING_ENDPOINT: &str = "/api/v2/mix/market/history-fund-rate";
const OPEN_INTEREST_ENDPOINT: &str = "/api/v2/mix/market/open-interest";

/// Client for the Bitget market-data endpoints.
pub struct BitgetClient {
    http: reqwest::Client,
    host: String,
    product_type: String,
    credentials: Option<Credentials>,
}

impl BitgetClient {
    /// Create a client with the default 10 s request timeout.
    pub fn new(
        host: impl Into<String>,
        product_type: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> ClientResult<Self> {
        Self::with_timeout(host, product_type, credentials, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(
        host: impl Into<String>,
        product_type: impl Into<String>,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            host: host.into(),
            product_type: product_type.into(),
            credentials,
        })
    }

    /// Fetch hourly candles in `[start_ms, end_ms)`, up to
    /// `CANDLE_PAGE_LIMIT` rows. Row order is not guaranteed by upstream.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> ClientResult<Vec<Candle>> {
        let envelope: ApiEnvelope<Vec<Vec<String>>> = self
            .get_json(
                CANDLES_ENDPOINT,
                &[
                    ("symbol", symbol.to_string()),
                    ("productType", self.product_type.clone()),
                    ("granularity", CANDLE_GRANULARITY.to_string()),
                    ("startTime", start_ms.to_string()),
                    ("endTime", end_ms.to_string()),
                    ("limit", CANDLE_PAGE_LIMIT.to_string()),
                ],
            )
            .await?;
        Ok(parse_candles(envelope.into_data_or_default()?))
    }

    /// Fetch one page of funding-rate history. Page 1 is the most recent;
    /// each page holds up to `FUNDING_PAGE_SIZE` settlements.
    pub async fn fetch_funding_page(
        &self,
        symbol: &str,
        page_no: u32,
    ) -> ClientResult<Vec<FundingEvent>> {
        let envelope: ApiEnvelope<Vec<RawFundingEntry>> = self
            .get_json(
                FUNDING_ENDPOINT,
                &[
                    ("symbol", symbol.to_string()),
                    ("productType", self.product_type.clone()),
                    ("pageSize", FUNDING_PAGE_SIZE.to_string()),
                    ("pageNo", page_no.to_string()),
                ],
            )
            .await?;
        Ok(parse_funding(envelope.into_data_or_default()?))
    }

    /// Fetch the current open-interest snapshot, normalized across the two
    /// upstream response shapes.
    pub async fn fetch_open_interest(&self, symbol: &str) -> ClientResult<OpenInterestSnapshot> {
        let envelope: ApiEnvelope<RawOpenInterest> = self
            .get_json(
                OPEN_INTEREST_ENDPOINT,
                &[
                    ("symbol", symbol.to_string()),
                    ("productType", self.product_type.clone()),
                ],
            )
            .await?;
        normalize_open_interest(envelope.into_data()?, Utc::now().timestamp_millis())
    }

    /// Issue a GET with sorted query parameters, signing when credentials
    /// are configured, and decode the response envelope.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ClientResult<ApiEnvelope<T>> {
        // The signature is computed over the sorted query, so the request
        // must be sent with the same ordering.
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let query = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let request_path = if query.is_empty() {
            endpoint.to_string()
        } else {
            format!("{endpoint}?{query}")
        };
        let url = format!("{}{}", self.host, request_path);

        debug!(%request_path, "Issuing API request");

        let mut request = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .header("locale", "en-US");

        if let Some(credentials) = &self.credentials {
            let timestamp = Utc::now().timestamp_millis().to_string();
            let signature = credentials.sign(&timestamp, "GET", &request_path, "")?;
            request = request
                .header("ACCESS-KEY", &credentials.api_key)
                .header("ACCESS-PASSPHRASE", &credentials.passphrase)
                .header("ACCESS-TIMESTAMP", &timestamp)
                .header("ACCESS-SIGN", signature);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ClientError::Decode(format!("invalid response body: {e}")))
    }
}
