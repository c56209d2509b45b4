use anyhow::anyhow;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::{header, Client};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::traits::{ProgressFn, TransferController};
use crate::config::CacheConfig;
use crate::detect::container::resolve_content_type;
use crate::engine::progress::ProgressTracker;
use crate::error::TransferError;
use crate::store::traits::Attachment;

/// Upper bound on the buffer reserved up front from a declared content-length (64 MB).
const MAX_PREALLOC_BYTES: u64 = 64 * 1024 * 1024;

/// Streaming GET over reqwest.
pub struct HttpTransfer {
    client: Client,
    default_content_type: String,
    progress_step: f64,
    max_bytes: u64,
}

impl HttpTransfer {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &CacheConfig) -> Self {
        Self {
            client,
            default_content_type: config.default_content_type.clone(),
            progress_step: config.progress_step_percent,
            max_bytes: config.max_download_bytes,
        }
    }

    async fn run(&self, url: &str, on_progress: ProgressFn<'_>) -> Result<Attachment, TransferError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(TransferError::failed)?;

        let status = resp.status();
        if !status.is_success() {
            warn!("http download failed status={} url={}", status.as_u16(), url);
            return Err(TransferError::failed(anyhow!("HTTP {}", status.as_u16())));
        }

        let total = resp.content_length().filter(|n| *n > 0);
        if let Some(total) = total {
            if total > self.max_bytes {
                return Err(TransferError::failed(anyhow!(
                    "content length {} exceeds limit {}",
                    total,
                    self.max_bytes
                )));
            }
        }
        let declared = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(
            "http download status={} length={:?} type={:?}",
            status.as_u16(),
            total,
            declared
        );

        let mut tracker = ProgressTracker::new(total, self.progress_step);
        let mut body = BytesMut::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC_BYTES) as usize);
        let mut stream = Box::pin(resp.bytes_stream());

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(TransferError::failed)?;
            if body.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(TransferError::failed(anyhow!(
                    "body exceeds limit {}",
                    self.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
            if let Some(percent) = tracker.record(chunk.len() as u64) {
                on_progress(percent);
            }
        }

        if let Some(total) = total {
            if body.len() as u64 != total {
                return Err(TransferError::failed(anyhow!(
                    "incomplete body: received {} of {} bytes",
                    body.len(),
                    total
                )));
            }
        }

        info!(
            "http download complete url={} bytes={} rate={}B/s",
            url,
            tracker.received(),
            tracker.bytes_per_second()
        );

        let content_type =
            resolve_content_type(declared.as_deref(), &body, &self.default_content_type);
        Ok(Attachment::new(content_type, body.freeze()))
    }
}

#[async_trait]
impl TransferController for HttpTransfer {
    async fn fetch(
        &self,
        url: &str,
        token: &CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<Attachment, TransferError> {
        if token.is_cancelled() {
            debug!("transfer of {} cancelled before start", url);
            return Err(TransferError::Cancelled);
        }

        // Dropping the in-flight request future tears down the connection.
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("transfer of {} aborted", url);
                Err(TransferError::Cancelled)
            }
            result = self.run(url, on_progress) => result,
        }
    }
}
