// Error taxonomy for transfers and the cache orchestrator.

use thiserror::Error;

/// Failure of a single transfer, as reported by a transfer controller.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The cancellation token was revoked before or during the transfer.
    #[error("transfer cancelled")]
    Cancelled,
    #[error("transfer failed: {0}")]
    Failed(#[source] anyhow::Error),
}

impl TransferError {
    pub fn failed(e: impl Into<anyhow::Error>) -> Self {
        Self::Failed(e.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}

/// User-initiated cancellation, re-raised to the caller of `download()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("download cancelled by user")]
pub struct Cancelled;

/// Failures caught at the orchestrator boundary. Kept inspectable on the
/// orchestrator instead of being propagated.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("transfer from {url} failed: {source}")]
    TransferFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("reading cached entry {id} failed: {source}")]
    StoreReadFailure {
        id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("persisting downloaded entry {id} failed: {source}")]
    StoreWriteFailure {
        id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("removing cached entry {id} failed: {source}")]
    EvictionFailure {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}
