use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A single stored binary with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub content_type: String,
    pub data: Bytes,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Raw byte count.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Persistent key/blob store holding at most one attachment per id.
///
/// Implementations must make `put` all-or-nothing: a failed put leaves either
/// the previous entry or no entry, never a partial one.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Fetch the attachment for `id`. A missing id is `Ok(None)`.
    async fn get(&self, id: &str) -> Result<Option<Attachment>>;
    /// Create or replace the attachment for `id`, returning the stored form.
    async fn put(&self, id: &str, attachment: Attachment) -> Result<Attachment>;
    /// Delete the entry for `id`. Returns whether an entry existed.
    async fn remove(&self, id: &str) -> Result<bool>;
}
