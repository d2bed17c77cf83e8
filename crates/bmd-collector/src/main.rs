//! Bitget market-data collector entry point.
//!
//! `collect` runs one synchronization cycle (the scheduler or operator
//! invokes it repeatedly); `status`, `gaps`, and `set-setting` are
//! operational helpers over the store.

use anyhow::Result;
use bmd_client::{BitgetClient, Credentials};
use bmd_core::Series;
use bmd_store::{JsonFileStore, SeriesStore};
use bmd_sync::{scan_gaps, CycleMode, CycleRunner, SyncError, TARGET_START_DATE_KEY};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod logging;

use config::CollectorConfig;

/// Bitget market-data collector
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BMD_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one collection cycle
    Collect {
        /// initial (full-range lookback) or update (resume from cursors)
        #[arg(long, value_enum)]
        mode: Mode,
        /// Custom start date (YYYY-MM-DD) for initial mode
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },
    /// Print the most recent run and the latest stored timestamps
    Status,
    /// Report detected holes in the stored series
    Gaps,
    /// Write an operator setting (e.g. target_start_date)
    SetSetting { key: String, value: String },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Mode {
    Initial,
    Update,
}

impl From<Mode> for CycleMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Initial => CycleMode::Initial,
            Mode::Update => CycleMode::Update,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging()?;
    info!("Starting bmd-collector v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > BMD_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("BMD_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = CollectorConfig::load(&config_path)?;

    let mut store = JsonFileStore::open(&config.data_dir)?;

    match args.command {
        Command::Collect { mode, start_date } => {
            run_collect(&config, &mut store, mode.into(), start_date).await
        }
        Command::Status => print_status(&config, &store),
        Command::Gaps => print_gaps(&config, &store),
        Command::SetSetting { key, value } => {
            store.set_setting(&key, &value)?;
            store.flush()?;
            info!(key = %key, value = %value, "Setting updated");
            Ok(())
        }
    }
}

async fn run_collect(
    config: &CollectorConfig,
    store: &mut JsonFileStore,
    mode: CycleMode,
    start_date: Option<NaiveDate>,
) -> Result<()> {
    let credentials = Credentials::from_env();
    if credentials.is_none() {
        info!("No API credentials in environment, issuing unsigned requests");
    }

    let client = BitgetClient::with_timeout(
        config.host.as_str(),
        config.product_type.as_str(),
        credentials,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let runner = CycleRunner::new(
        Arc::new(client),
        config.tracked_symbols()?,
        config.sync.clone(),
    );

    match runner.run_cycle(store, mode, start_date).await {
        Ok(report) => {
            if !report.is_clean() {
                for asset in &report.assets {
                    for err in &asset.errors {
                        error!(asset = %asset.asset, error = %err, "Series failed this cycle");
                    }
                }
            }
            Ok(())
        }
        Err(e @ SyncError::CycleInProgress) => {
            error!("Another cycle is already running");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_status(config: &CollectorConfig, store: &JsonFileStore) -> Result<()> {
    match store.last_run()? {
        Some(entry) => println!(
            "last run: {} {} ({})",
            entry.executed_at.to_rfc3339(),
            entry.status,
            entry.message
        ),
        None => println!("last run: none recorded"),
    }

    for tracked in config.tracked_symbols()? {
        for series in [Series::Candles, Series::Funding, Series::OpenInterest] {
            let last = store.last_timestamp(series, &tracked.asset)?;
            println!(
                "{} {}: {}",
                tracked.asset,
                series,
                last.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
            );
        }
    }
    Ok(())
}

fn print_gaps(config: &CollectorConfig, store: &JsonFileStore) -> Result<()> {
    let target_start = store
        .get_setting(TARGET_START_DATE_KEY)?
        .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok());

    let assets: Vec<_> = config
        .tracked_symbols()?
        .into_iter()
        .map(|t| t.asset)
        .collect();
    let report = scan_gaps(store, &assets, target_start)?;

    if report.is_empty() {
        println!("No gaps detected");
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
