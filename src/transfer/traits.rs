use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransferError;
use crate::store::traits::Attachment;

/// Progress callback receiving a percentage in `[0, 100)`.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

#[async_trait]
pub trait TransferController: Send + Sync {
    /// Fetch the whole payload at `url`.
    ///
    /// `on_progress` is called with non-decreasing values below 100; completion
    /// is signalled only by returning. A revoked `token` aborts the request
    /// with [`TransferError::Cancelled`]. No partial payload is ever returned.
    async fn fetch(
        &self,
        url: &str,
        token: &CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<Attachment, TransferError>;
}
