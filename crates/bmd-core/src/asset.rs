//! Tracked asset identifiers.
//!
//! An `Asset` is the base-currency name of a trading pair ("BTC" for
//! "BTCUSDT"). Assets are configured at startup and used as one half of
//! every series primary key.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base-currency identifier for a tracked trading pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    /// Derive the asset name from an exchange trading-pair symbol by
    /// stripping the quote-currency suffix ("BTCUSDT" + "USDT" -> "BTC").
    ///
    /// # Errors
    /// Returns `CoreError::InvalidSymbol` if the symbol does not end with
    /// the quote suffix or strips down to nothing.
    pub fn from_symbol(symbol: &str, quote: &str) -> Result<Self> {
        let base = symbol
            .strip_suffix(quote)
            .ok_or_else(|| CoreError::InvalidSymbol(symbol.to_string()))?;
        if base.is_empty() {
            return Err(CoreError::InvalidSymbol(symbol.to_string()));
        }
        Ok(Self(base.to_string()))
    }

    /// Construct from an already-stripped name (e.g. when read back from
    /// the store).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Asset {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
