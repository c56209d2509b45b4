// Cache orchestrator state machine — owns one media item's cache, download and handle.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handle::{HandleRegistry, PresentableHandle};
use super::size::human_size;
use super::state::{CacheSnapshot, DownloadOutcome, Phase, RemovalOutcome};
use crate::config::CacheConfig;
use crate::error::{CacheError, Cancelled, TransferError};
use crate::source::descriptor::MediaDescriptor;
use crate::source::resolver::resolve_remote_url;
use crate::store::traits::{Attachment, AttachmentStore};
use crate::transfer::traits::TransferController;

struct Inner {
    phase: Phase,
    /// Token handed to the next (or current) transfer.
    token: CancellationToken,
    handle: Option<PresentableHandle>,
    size_bytes: u64,
    last_error: Option<Arc<CacheError>>,
    /// Incremented for every download attempt.
    attempt: u64,
}

impl Inner {
    fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            phase: self.phase.clone(),
            handle: self.handle.clone(),
            size_bytes: self.size_bytes,
        }
    }
}

pub struct CacheOrchestrator {
    descriptor: MediaDescriptor,
    remote_url: String,
    store: Arc<dyn AttachmentStore>,
    transfer: Arc<dyn TransferController>,
    handles: Arc<HandleRegistry>,
    online: watch::Receiver<bool>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<CacheSnapshot>,
}

impl CacheOrchestrator {
    /// Build an orchestrator in the `CheckingCache` phase without touching the store.
    ///
    /// Call [`check_cache`](Self::check_cache) to finish initialization, or use
    /// [`open`](Self::open) which does both.
    pub fn new(
        descriptor: MediaDescriptor,
        config: &CacheConfig,
        store: Arc<dyn AttachmentStore>,
        transfer: Arc<dyn TransferController>,
        handles: Arc<HandleRegistry>,
        online: watch::Receiver<bool>,
    ) -> Self {
        let remote_url = resolve_remote_url(&descriptor, config);
        let inner = Inner {
            phase: Phase::CheckingCache,
            token: CancellationToken::new(),
            handle: None,
            size_bytes: 0,
            last_error: None,
            attempt: 0,
        };
        let (state_tx, _rx) = watch::channel(inner.snapshot());

        Self {
            descriptor,
            remote_url,
            store,
            transfer,
            handles,
            online,
            inner: Mutex::new(inner),
            state_tx,
        }
    }

    /// Build an orchestrator and run the initial cache lookup.
    pub async fn open(
        descriptor: MediaDescriptor,
        config: &CacheConfig,
        store: Arc<dyn AttachmentStore>,
        transfer: Arc<dyn TransferController>,
        handles: Arc<HandleRegistry>,
        online: watch::Receiver<bool>,
    ) -> Arc<Self> {
        let orchestrator = Arc::new(Self::new(
            descriptor, config, store, transfer, handles, online,
        ));
        orchestrator.check_cache().await;
        orchestrator
    }

    /// Look the item up in the store. Returns whether it ended up cached.
    ///
    /// Ignored while downloading or already cached. A read failure degrades to
    /// `Idle` and is kept in [`last_error`](Self::last_error).
    pub async fn check_cache(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            match inner.phase {
                Phase::Downloading { .. } => return false,
                Phase::Cached { .. } => return true,
                _ => {}
            }
            inner.phase = Phase::CheckingCache;
            self.publish(&inner);
        }

        let id = &self.descriptor.id;
        let (found, read_error) = match self.store.get(id).await {
            Ok(found) => (found, None),
            Err(source) => {
                warn!("cache lookup for {} failed, treating as absent: {:#}", id, source);
                let err = CacheError::StoreReadFailure {
                    id: id.clone(),
                    source,
                };
                (None, Some(Arc::new(err)))
            }
        };

        let mut inner = self.inner.lock();
        // A download started while the lookup was suspended owns the state now.
        if !matches!(inner.phase, Phase::CheckingCache) {
            debug!("discarding cache lookup for {}, phase is {}", id, inner.phase.name());
            return inner.phase.is_cached();
        }
        if read_error.is_some() {
            inner.last_error = read_error;
        }
        let cached = match found {
            Some(attachment) => {
                info!("{} found in cache ({})", id, human_size(attachment.len()));
                self.present(&mut inner, attachment);
                true
            }
            None => {
                debug!("{} not cached", id);
                inner.phase = Phase::Idle;
                false
            }
        };
        self.publish(&inner);
        cached
    }

    /// Download, persist and present the item.
    ///
    /// Only `Err(Cancelled)` is returned as an error; every other failure is
    /// reported through [`DownloadOutcome::Failed`] and the `Error` phase.
    pub async fn download(&self) -> Result<DownloadOutcome, Cancelled> {
        let id = &self.descriptor.id;
        let (token, attempt) = {
            let mut inner = self.inner.lock();
            match inner.phase {
                Phase::Downloading { .. } => {
                    debug!("download of {} already in progress", id);
                    return Ok(DownloadOutcome::AlreadyDownloading);
                }
                Phase::Cached { size_bytes } => {
                    return Ok(DownloadOutcome::AlreadyCached { size_bytes });
                }
                _ => {}
            }
            inner.attempt += 1;
            inner.phase = Phase::Downloading { progress: 0.0 };
            inner.last_error = None;
            self.publish(&inner);
            (inner.token.clone(), inner.attempt)
        };

        info!("downloading {} from {}", id, self.remote_url);

        let on_progress = |percent: f64| self.record_progress(attempt, percent);
        let attachment = match self
            .transfer
            .fetch(&self.remote_url, &token, &on_progress)
            .await
        {
            Ok(attachment) => attachment,
            Err(TransferError::Cancelled) => return Err(self.finish_cancelled(attempt)),
            Err(TransferError::Failed(source)) => {
                // An aborted connection after cancellation is still a cancellation.
                if token.is_cancelled() {
                    debug!("download of {} failed after cancellation: {:#}", id, source);
                    return Err(self.finish_cancelled(attempt));
                }
                warn!("download of {} failed: {:#}", id, source);
                let err = CacheError::TransferFailed {
                    url: self.remote_url.clone(),
                    source,
                };
                return Ok(self.finish_failed(attempt, err));
            }
        };

        // A result that lands after cancellation belongs to a superseded token.
        if token.is_cancelled() {
            debug!("ignoring late completion of cancelled download {}", id);
            return Err(self.finish_cancelled(attempt));
        }

        let stored = match self.store.put(id, attachment).await {
            Ok(stored) => stored,
            Err(source) => {
                error!("persisting {} failed: {:#}", id, source);
                let err = CacheError::StoreWriteFailure {
                    id: id.clone(),
                    source,
                };
                return Ok(self.finish_failed(attempt, err));
            }
        };

        if token.is_cancelled() {
            debug!("download {} cancelled during store write, discarding entry", id);
            if let Err(e) = self.store.remove(id).await {
                warn!("discarding cancelled entry {} failed: {:#}", id, e);
            }
            return Err(self.finish_cancelled(attempt));
        }

        let size_bytes = stored.len();
        let mut inner = self.inner.lock();
        self.present(&mut inner, stored);
        self.publish(&inner);
        info!("{} cached ({})", id, human_size(size_bytes));
        Ok(DownloadOutcome::Cached { size_bytes })
    }

    /// Ask the in-flight transfer to abort. Returns `false` when nothing is downloading.
    ///
    /// The phase stays `Downloading` until the transfer acknowledges the abort.
    pub fn cancel_download(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.phase.is_downloading() {
            debug!(
                "nothing to cancel for {}, phase is {}",
                self.descriptor.id,
                inner.phase.name()
            );
            return false;
        }
        inner.token.cancel();
        inner.token = CancellationToken::new();
        debug!("cancellation requested for {}", self.descriptor.id);
        true
    }

    /// Delete the cached entry and clear every derived value.
    ///
    /// Never fails: a missing entry or a store error still ends in `Idle`.
    /// Refused while a download is in flight.
    pub async fn remove_cached_video(&self) -> RemovalOutcome {
        if self.inner.lock().phase.is_downloading() {
            debug!("not removing {} while downloading", self.descriptor.id);
            return RemovalOutcome::Busy;
        }

        let id = &self.descriptor.id;
        let outcome = match self.store.remove(id).await {
            Ok(true) => {
                info!("removed cached {}", id);
                RemovalOutcome::Removed
            }
            Ok(false) => {
                info!("no cached entry for {} to remove", id);
                RemovalOutcome::NotPresent
            }
            Err(source) => {
                warn!("removing cached {} failed: {:#}", id, source);
                RemovalOutcome::Failed(Arc::new(CacheError::EvictionFailure {
                    id: id.clone(),
                    source,
                }))
            }
        };

        let mut inner = self.inner.lock();
        if inner.phase.is_downloading() {
            return outcome;
        }
        if let Some(handle) = inner.handle.take() {
            self.handles.revoke(&handle);
        }
        inner.size_bytes = 0;
        inner.phase = Phase::Idle;
        if let RemovalOutcome::Failed(err) = &outcome {
            inner.last_error = Some(err.clone());
        }
        self.publish(&inner);
        outcome
    }

    pub fn descriptor(&self) -> &MediaDescriptor {
        &self.descriptor
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase.clone()
    }

    pub fn is_downloading(&self) -> bool {
        self.inner.lock().phase.is_downloading()
    }

    /// Download percentage, present only while downloading.
    pub fn progress(&self) -> Option<f64> {
        self.inner.lock().phase.progress()
    }

    pub fn handle(&self) -> Option<PresentableHandle> {
        self.inner.lock().handle.clone()
    }

    /// Authoritative size of the cached entry in bytes, zero when nothing is cached.
    pub fn size_bytes(&self) -> u64 {
        self.inner.lock().size_bytes
    }

    /// Rounded human-readable size, present only while cached.
    pub fn size(&self) -> Option<String> {
        self.snapshot().size()
    }

    pub fn online(&self) -> bool {
        *self.online.borrow()
    }

    /// Most recent failure, including ones that did not leave the `Error` phase.
    pub fn last_error(&self) -> Option<Arc<CacheError>> {
        self.inner.lock().last_error.clone()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.lock().snapshot()
    }

    /// Observe state changes. The receiver starts at the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<CacheSnapshot> {
        self.state_tx.subscribe()
    }

    fn record_progress(&self, attempt: u64, percent: f64) {
        let mut inner = self.inner.lock();
        if inner.attempt != attempt || !(0.0..100.0).contains(&percent) {
            return;
        }
        match &mut inner.phase {
            Phase::Downloading { progress } if percent > *progress => *progress = percent,
            _ => return,
        }
        self.publish(&inner);
    }

    fn finish_cancelled(&self, attempt: u64) -> Cancelled {
        let mut inner = self.inner.lock();
        if inner.attempt == attempt && inner.phase.is_downloading() {
            inner.phase = Phase::Idle;
            self.publish(&inner);
        }
        debug!("download of {} cancelled", self.descriptor.id);
        Cancelled
    }

    fn finish_failed(&self, attempt: u64, err: CacheError) -> DownloadOutcome {
        let err = Arc::new(err);
        let mut inner = self.inner.lock();
        if inner.attempt == attempt && inner.phase.is_downloading() {
            inner.phase = Phase::Error(err.clone());
        }
        inner.last_error = Some(err.clone());
        self.publish(&inner);
        DownloadOutcome::Failed(err)
    }

    /// Swap in a handle for `attachment`, revoking the previous one.
    fn present(&self, inner: &mut Inner, attachment: Attachment) {
        let size_bytes = attachment.len();
        let handle = self.handles.create(attachment);
        if let Some(previous) = inner.handle.replace(handle) {
            self.handles.revoke(&previous);
        }
        inner.size_bytes = size_bytes;
        inner.phase = Phase::Cached { size_bytes };
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.snapshot());
    }
}

impl Drop for CacheOrchestrator {
    fn drop(&mut self) {
        let handle = {
            let inner = self.inner.get_mut();
            inner.token.cancel();
            inner.handle.take()
        };
        if let Some(handle) = handle {
            self.handles.revoke(&handle);
        }
        debug!("orchestrator for {} dropped", self.descriptor.id);
    }
}
