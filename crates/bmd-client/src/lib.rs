//! Signed REST client for Bitget market-data endpoints.
//!
//! This crate provides:
//! - `BitgetClient`: the HTTP client (candle history, funding history,
//!   open-interest snapshot) with HMAC-SHA256 request signing
//! - `MarketDataSource`: the trait the sync engine is written against
//! - `MockSource`: a scriptable implementation for tests
//! - Wire types and the `{code, msg, data}` envelope normalization

pub mod error;
pub mod rest;
pub mod sign;
pub mod source;
pub mod types;

pub use error::{ClientError, ClientResult};
pub use rest::{
    BitgetClient, CANDLE_PAGE_LIMIT, DEFAULT_HOST, DEFAULT_PRODUCT_TYPE, FUNDING_PAGE_SIZE,
};
pub use sign::Credentials;
pub use source::{BoxFuture, DynMarketDataSource, MarketDataSource, MockSource};
pub use types::{Candle, FundingEvent, OpenInterestSnapshot, SUCCESS_CODE};
