//! Epoch-millisecond timestamp helpers.
//!
//! The exchange API speaks epoch milliseconds; the store speaks
//! `DateTime<Utc>`. Conversions live here so the sync engine never does
//! raw arithmetic on mixed representations.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};

/// One hour in milliseconds.
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Convert an epoch-millisecond timestamp to `DateTime<Utc>`.
///
/// # Errors
/// Returns `CoreError::TimestampOutOfRange` for values chrono cannot
/// represent.
pub fn datetime_from_ms(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(CoreError::TimestampOutOfRange(ms))
}

/// Whole hours elapsed from `earlier` to `later`, truncated toward zero.
///
/// Negative when `later` precedes `earlier`.
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_seconds() / 3600
}
