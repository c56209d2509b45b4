// On-disk attachment store — one directory per media id, swapped into place atomically.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use super::traits::{Attachment, AttachmentStore};

const META_FILE: &str = "meta.json";
const STAGING_NEW: &str = "tmp";
const STAGING_OLD: &str = "old";

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    content_type: String,
    size_bytes: u64,
}

pub struct FsStore {
    root: PathBuf,
    attachment_name: String,
}

impl FsStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Staging directories left behind by an interrupted `put` are removed.
    /// Anything else under `root` is left alone.
    pub fn new(root: &Path, attachment_name: &str) -> Result<Self> {
        if attachment_name.is_empty() || attachment_name == META_FILE {
            return Err(anyhow!("invalid attachment name {:?}", attachment_name));
        }

        std::fs::create_dir_all(root)?;

        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir || !is_staging_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            debug!("removing stale staging dir {}", entry.path().display());
            if let Err(e) = std::fs::remove_dir_all(entry.path()) {
                warn!("failed to remove stale staging dir {}: {}", entry.path().display(), e);
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            attachment_name: attachment_name.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, id: &str) -> PathBuf {
        self.root.join(encode_id(id))
    }

    fn staging_dir(&self, id: &str, kind: &str) -> PathBuf {
        self.root
            .join(format!(".{}.{}-{}", encode_id(id), kind, Uuid::new_v4().simple()))
    }

    async fn write_staged(&self, staging: &Path, attachment: &Attachment) -> Result<()> {
        fs::create_dir(staging).await?;
        fs::write(staging.join(&self.attachment_name), &attachment.data).await?;
        let meta = EntryMeta {
            content_type: attachment.content_type.clone(),
            size_bytes: attachment.len(),
        };
        fs::write(staging.join(META_FILE), serde_json::to_vec(&meta)?).await?;
        Ok(())
    }

    async fn swap_into_place(&self, staging: &Path, target: &Path, id: &str) -> Result<()> {
        let previous = match fs::metadata(target).await {
            Ok(_) => {
                let old = self.staging_dir(id, STAGING_OLD);
                fs::rename(target, &old).await?;
                Some(old)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = fs::rename(staging, target).await {
            // Put the previous entry back so the failed put leaves it untouched.
            if let Some(old) = &previous {
                let _ = fs::rename(old, target).await;
            }
            return Err(e.into());
        }

        if let Some(old) = previous {
            if let Err(e) = fs::remove_dir_all(&old).await {
                warn!("failed to remove replaced entry {}: {}", old.display(), e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AttachmentStore for FsStore {
    async fn get(&self, id: &str) -> Result<Option<Attachment>> {
        let dir = self.entry_dir(id);
        let meta_bytes = match fs::read(dir.join(META_FILE)).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if fs::metadata(&dir).await.is_ok() {
                    return Err(anyhow!("entry {} has no metadata", id));
                }
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let meta: EntryMeta =
            serde_json::from_slice(&meta_bytes).with_context(|| format!("bad metadata for {}", id))?;

        let data = fs::read(dir.join(&self.attachment_name))
            .await
            .with_context(|| format!("missing attachment for {}", id))?;
        if data.len() as u64 != meta.size_bytes {
            return Err(anyhow!(
                "entry {} size {} != recorded size {}",
                id,
                data.len(),
                meta.size_bytes
            ));
        }

        Ok(Some(Attachment {
            content_type: meta.content_type,
            data: Bytes::from(data),
        }))
    }

    async fn put(&self, id: &str, attachment: Attachment) -> Result<Attachment> {
        let staging = self.staging_dir(id, STAGING_NEW);
        let target = self.entry_dir(id);

        let result = match self.write_staged(&staging, &attachment).await {
            Ok(()) => self.swap_into_place(&staging, &target, id).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e.context(format!("put {} failed", id)));
        }

        debug!("stored {} ({} bytes) at {}", id, attachment.len(), target.display());
        Ok(attachment)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        match fs::remove_dir_all(self.entry_dir(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Hex-encode an id so any string maps to a safe, unique directory name.
fn encode_id(id: &str) -> String {
    id.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// Matches the `.{hex id}.{tmp|old}-{uuid}` names produced by `staging_dir`.
fn is_staging_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix('.') else {
        return false;
    };
    let Some((head, nonce)) = rest.rsplit_once('-') else {
        return false;
    };
    let Some((id_hex, kind)) = head.rsplit_once('.') else {
        return false;
    };
    let is_hex = |s: &str| s.bytes().all(|b| b.is_ascii_hexdigit());
    (kind == STAGING_NEW || kind == STAGING_OLD)
        && id_hex.len() % 2 == 0
        && is_hex(id_hex)
        && nonce.len() == 32
        && is_hex(nonce)
}
