use std::fmt;

use serde::Deserialize;

/// Where a media item's `url` is rooted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum StorageProvider {
    /// Relative to the configured local base URL.
    Local,
    /// Object storage; only the file name of `url` is meaningful.
    DigitalOcean,
    /// Any other tag. The url is used as-is.
    Other(String),
}

impl From<String> for StorageProvider {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "local" => StorageProvider::Local,
            "digitalocean" => StorageProvider::DigitalOcean,
            _ => StorageProvider::Other(tag),
        }
    }
}

impl From<&str> for StorageProvider {
    fn from(tag: &str) -> Self {
        StorageProvider::from(tag.to_string())
    }
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageProvider::Local => f.write_str("local"),
            StorageProvider::DigitalOcean => f.write_str("digitalocean"),
            StorageProvider::Other(tag) => f.write_str(tag),
        }
    }
}

/// Immutable description of one media item, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaDescriptor {
    pub id: String,
    pub provider: StorageProvider,
    pub url: String,
}

impl MediaDescriptor {
    pub fn new(
        id: impl Into<String>,
        provider: impl Into<StorageProvider>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            url: url.into(),
        }
    }
}
