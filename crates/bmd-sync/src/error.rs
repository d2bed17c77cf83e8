//! Sync engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Client error: {0}")]
    Client(#[from] bmd_client::ClientError),

    #[error("Store error: {0}")]
    Store(#[from] bmd_store::StoreError),

    #[error("Core error: {0}")]
    Core(#[from] bmd_core::CoreError),

    #[error("A sync cycle is already in flight")]
    CycleInProgress,
}

pub type SyncResult<T> = Result<T, SyncError>;
