//! Collector configuration.
//!
//! Loaded from TOML; every field has a default so an absent file still
//! yields a runnable configuration. API credentials come from the
//! environment only (see `bmd_client::sign`), never from this file.

use anyhow::{Context, Result};
use bmd_sync::{SyncConfig, TrackedSymbol};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// API host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Exchange product type.
    #[serde(default = "default_product_type")]
    pub product_type: String,
    /// Tracked trading pairs.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Quote currency stripped from symbols to derive asset names.
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
    /// Store directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Sync engine tuning.
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_host() -> String {
    bmd_client::DEFAULT_HOST.to_string()
}

fn default_product_type() -> String {
    bmd_client::DEFAULT_PRODUCT_TYPE.to_string()
}

fn default_symbols() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "SOLUSDT".to_string(),
    ]
}

fn default_quote_currency() -> String {
    "USDT".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            product_type: default_product_type(),
            symbols: default_symbols(),
            quote_currency: default_quote_currency(),
            data_dir: default_data_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            sync: SyncConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Load from the given path, falling back to defaults when the file is
    /// missing.
    pub fn load(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config file {path}"))
    }

    /// Tracked symbols with their derived asset names.
    pub fn tracked_symbols(&self) -> Result<Vec<TrackedSymbol>> {
        self.symbols
            .iter()
            .map(|s| {
                TrackedSymbol::new(s.as_str(), &self.quote_currency)
                    .with_context(|| format!("invalid symbol {s:?}"))
            })
            .collect()
    }
}
