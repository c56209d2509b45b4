use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{Attachment, AttachmentStore};

/// Process-local store; entries live as long as the store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Attachment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Attachment>> {
        Ok(self.entries.read().get(id).cloned())
    }

    async fn put(&self, id: &str, attachment: Attachment) -> Result<Attachment> {
        self.entries
            .write()
            .insert(id.to_string(), attachment.clone());
        Ok(attachment)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.entries.write().remove(id).is_some())
    }
}
