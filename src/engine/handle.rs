// Presentable handles — revocable URLs over in-memory media bytes.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::DEFAULT_HANDLE_ORIGIN;
use crate::store::traits::Attachment;

/// Process-local reference to bytes held by a [`HandleRegistry`].
///
/// The handle itself is plain data; the bytes stay reachable only until the
/// handle is revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentableHandle {
    key: String,
    url: String,
    content_type: String,
    size_bytes: u64,
}

impl PresentableHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Object store behind presentable handles, shared by all orchestrators of a
/// process and by the media server.
pub struct HandleRegistry {
    origin: RwLock<String>,
    objects: RwLock<HashMap<String, Attachment>>,
}

impl HandleRegistry {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: RwLock::new(origin.into()),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Origin prefixed to newly created handle URLs.
    pub fn origin(&self) -> String {
        self.origin.read().clone()
    }

    /// Change the origin used for handles created from now on.
    pub fn set_origin(&self, origin: impl Into<String>) {
        *self.origin.write() = origin.into();
    }

    /// Register `attachment` and hand out a fresh handle for it.
    pub fn create(&self, attachment: Attachment) -> PresentableHandle {
        let key = Uuid::new_v4().simple().to_string();
        let url = format!("{}/{}", self.origin.read(), key);
        let handle = PresentableHandle {
            key: key.clone(),
            url,
            content_type: attachment.content_type.clone(),
            size_bytes: attachment.len(),
        };
        self.objects.write().insert(key, attachment);
        debug!("handle created {} ({} bytes)", handle.url, handle.size_bytes);
        handle
    }

    /// Release the bytes behind `handle`. Returns `false` if it was already revoked.
    pub fn revoke(&self, handle: &PresentableHandle) -> bool {
        let removed = self.objects.write().remove(&handle.key).is_some();
        if removed {
            debug!("handle revoked {}", handle.url);
        }
        removed
    }

    /// Look up the bytes behind a live handle key.
    pub fn resolve(&self, key: &str) -> Option<Attachment> {
        self.objects.read().get(key).cloned()
    }

    pub fn is_live(&self, handle: &PresentableHandle) -> bool {
        self.objects.read().contains_key(&handle.key)
    }

    pub fn live_count(&self) -> usize {
        self.objects.read().len()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_ORIGIN)
    }
}
