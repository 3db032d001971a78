// crates/sync-engine/src/error.rs
//! Error types for sync operations

use crate::channel::ChannelError;
use shelfcast_core::AppError;
use shelfcast_resilience::ResilienceError;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local cache failure
    #[error("Storage error: {0}")]
    Storage(#[from] AppError),

    /// The remote server refused or failed the call
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The remote call did not finish in time
    #[error("{0}")]
    Resilience(#[from] ResilienceError),
}

impl SyncError {
    /// Returns true if the remote reported a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Channel(ChannelError::NotFound(_)))
    }

    /// Returns true if the same call may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Channel(e) => e.is_retryable(),
            Self::Resilience(_) => true,
        }
    }
}
