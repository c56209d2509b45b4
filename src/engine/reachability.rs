// Online/offline signal — advisory state observed by orchestrators.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ReachabilitySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReachabilitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a connectivity change. Subscribers wake only on an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!("network reachability changed: online={}", online);
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Poll `url` with HEAD requests every `interval` until `shutdown` fires.
    ///
    /// Any HTTP response counts as online; connection errors count as offline.
    pub fn spawn_poller(
        &self,
        url: String,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let signal = self.clone();
        let client = Client::builder()
            .timeout(interval.max(Duration::from_secs(1)))
            .build()
            .unwrap_or_else(|_| Client::new());

        tokio::spawn(async move {
            loop {
                let online = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    resp = client.head(&url).send() => resp.is_ok(),
                };
                debug!("reachability check {} online={}", url, online);
                signal.set_online(online);

                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        })
    }
}

impl Default for ReachabilitySignal {
    fn default() -> Self {
        Self::new(true)
    }
}
