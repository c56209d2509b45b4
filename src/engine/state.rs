use std::sync::Arc;

use super::handle::PresentableHandle;
use super::size::human_size;
use crate::error::CacheError;

/// The orchestrator's current phase. Exactly one is active at a time.
#[derive(Debug, Clone)]
pub enum Phase {
    /// Initial store lookup in progress.
    CheckingCache,
    Idle,
    /// Transfer in flight; `progress` is a percentage in `[0, 100)`.
    Downloading { progress: f64 },
    Cached { size_bytes: u64 },
    /// Last download failed. A new download clears it.
    Error(Arc<CacheError>),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::CheckingCache => "checking_cache",
            Phase::Idle => "idle",
            Phase::Downloading { .. } => "downloading",
            Phase::Cached { .. } => "cached",
            Phase::Error(_) => "error",
        }
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self, Phase::Downloading { .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Phase::Cached { .. })
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            Phase::Downloading { progress } => Some(*progress),
            _ => None,
        }
    }
}

/// Everything an observer needs to render one media item.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub phase: Phase,
    pub handle: Option<PresentableHandle>,
    pub size_bytes: u64,
}

impl CacheSnapshot {
    pub fn progress(&self) -> Option<f64> {
        self.phase.progress()
    }

    /// Rounded human-readable size, present only while cached.
    pub fn size(&self) -> Option<String> {
        match self.phase {
            Phase::Cached { size_bytes } => Some(human_size(size_bytes)),
            _ => None,
        }
    }
}

/// Result of a `download()` call that was not cancelled.
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    /// Downloaded, persisted and presentable.
    Cached { size_bytes: u64 },
    /// Another call already owns the transfer; nothing was started.
    AlreadyDownloading,
    /// The item was cached before the call; nothing was started.
    AlreadyCached { size_bytes: u64 },
    /// The attempt failed and the orchestrator is in the `Error` phase.
    Failed(Arc<CacheError>),
}

/// Result of `remove_cached_video()`.
#[derive(Debug, Clone)]
pub enum RemovalOutcome {
    Removed,
    /// There was no entry to delete.
    NotPresent,
    /// The store failed to delete; derived state was cleared anyway.
    Failed(Arc<CacheError>),
    /// A download is in flight; nothing was touched.
    Busy,
}
