use anyhow::{Context, Result};
use serde::Deserialize;

/// Content type assumed when neither the origin nor the payload says otherwise.
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// Name of the single attachment stored per media id.
pub const DEFAULT_ATTACHMENT_NAME: &str = "movie.mp4";

/// Minimum percentage advance between two progress reports.
pub const DEFAULT_PROGRESS_STEP_PERCENT: f64 = 1.0;

/// Largest payload a single download may produce (4 GB).
pub const MAX_DOWNLOAD_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Origin used for presentable handle URLs when no media server is attached.
pub const DEFAULT_HANDLE_ORIGIN: &str = "blob:ma-video-cache";

/// Top-level configuration for the video cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base URL prepended to descriptors stored with the `local` provider.
    pub local_base_url: String,
    /// Base URL of the remote object storage (`digitalocean` provider).
    pub remote_base_url: String,
    /// Fallback content type for downloaded payloads.
    pub default_content_type: String,
    /// Attachment name used by stores that keep a file per entry.
    pub attachment_name: String,
    /// Progress is reported only after advancing by at least this many percent.
    pub progress_step_percent: f64,
    /// Downloads larger than this are aborted as failed.
    pub max_download_bytes: u64,
    /// Origin for handle URLs.
    pub handle_origin: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_base_url: String::new(),
            remote_base_url: String::new(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            attachment_name: DEFAULT_ATTACHMENT_NAME.to_string(),
            progress_step_percent: DEFAULT_PROGRESS_STEP_PERCENT,
            max_download_bytes: MAX_DOWNLOAD_BYTES,
            handle_origin: DEFAULT_HANDLE_ORIGIN.to_string(),
        }
    }
}

impl CacheConfig {
    /// Config with the two resolver base URLs set and everything else defaulted.
    pub fn with_base_urls(local_base_url: impl Into<String>, remote_base_url: impl Into<String>) -> Self {
        Self {
            local_base_url: local_base_url.into(),
            remote_base_url: remote_base_url.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid cache config")
    }
}
