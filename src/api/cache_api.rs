use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::CacheConfig;
use crate::engine::handle::HandleRegistry;
use crate::engine::orchestrator::CacheOrchestrator;
use crate::engine::reachability::ReachabilitySignal;
use crate::server::handler::MediaServer;
use crate::source::descriptor::MediaDescriptor;
use crate::store::fs::FsStore;
use crate::store::traits::AttachmentStore;
use crate::transfer::http::HttpTransfer;
use crate::transfer::traits::TransferController;

/// Shared collaborators for every media item of an application.
pub struct VideoCache {
    config: CacheConfig,
    store: Arc<dyn AttachmentStore>,
    transfer: Arc<dyn TransferController>,
    handles: Arc<HandleRegistry>,
    reachability: ReachabilitySignal,
}

impl VideoCache {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn AttachmentStore>,
        transfer: Arc<dyn TransferController>,
        reachability: ReachabilitySignal,
    ) -> Self {
        let handles = Arc::new(HandleRegistry::new(config.handle_origin.clone()));
        Self {
            config,
            store,
            transfer,
            handles,
            reachability,
        }
    }

    /// Filesystem store under `cache_dir` plus the reqwest transfer controller.
    pub fn with_http(config: CacheConfig, cache_dir: &Path) -> Result<Self> {
        let store = Arc::new(FsStore::new(cache_dir, &config.attachment_name)?);
        let transfer = Arc::new(HttpTransfer::new(&config));
        Ok(Self::new(config, store, transfer, ReachabilitySignal::default()))
    }

    /// Create the orchestrator for `descriptor` and run its cache lookup.
    pub async fn open(&self, descriptor: MediaDescriptor) -> Arc<CacheOrchestrator> {
        CacheOrchestrator::open(
            descriptor,
            &self.config,
            self.store.clone(),
            self.transfer.clone(),
            self.handles.clone(),
            self.reachability.subscribe(),
        )
        .await
    }

    /// Serve handles over local HTTP. Open items before or after; only handles
    /// created after this call point at the server.
    pub async fn serve(&self) -> Result<MediaServer> {
        MediaServer::start(self.handles.clone()).await
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    pub fn reachability(&self) -> &ReachabilitySignal {
        &self.reachability
    }
}
