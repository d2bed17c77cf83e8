//! Error types for bmd-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Timestamp out of range: {0} ms")]
    TimestampOutOfRange(i64),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
