//! Incremental synchronization and gap-reconciliation engine.
//!
//! Per tracked asset, three routines keep the store converged with the
//! exchange:
//! - `candles`: fixed-span window walk with a strictly advancing cursor
//! - `funding`: backward pagination down to an exclusive cutoff
//! - `open_interest`: snapshot reconciliation with linear gap interpolation
//!
//! `cursor` resolves each routine's starting point from store state and
//! configuration; `orchestrator` sequences the routines per asset under a
//! single-cycle mutual-exclusion guard; `gaps` is a read-only diagnostic.

pub mod candles;
pub mod config;
pub mod cursor;
pub mod error;
pub mod funding;
pub mod gaps;
pub mod open_interest;
pub mod orchestrator;

pub use candles::{sync_candles, CandleSyncReport};
pub use config::SyncConfig;
pub use cursor::{
    resolve_candle_start, resolve_funding_cutoff, CursorContext, CycleMode,
    TARGET_START_DATE_KEY,
};
pub use error::{SyncError, SyncResult};
pub use funding::{sync_funding, FundingSyncReport};
pub use gaps::{scan_gaps, GapEntry, GapReport};
pub use open_interest::{reconcile_open_interest, OiReconcileReport};
pub use orchestrator::{AssetReport, CycleReport, CycleRunner, TrackedSymbol};
