use super::descriptor::{MediaDescriptor, StorageProvider};
use crate::config::CacheConfig;

/// Map a descriptor to the fully-qualified URL it is fetched from.
///
/// Object-storage URLs keep only their final path segment, so entries that
/// were stored under an older bucket or prefix still resolve against the
/// current remote base.
pub fn resolve_remote_url(descriptor: &MediaDescriptor, config: &CacheConfig) -> String {
    match &descriptor.provider {
        StorageProvider::Local => format!("{}/{}", config.local_base_url, descriptor.url),
        StorageProvider::DigitalOcean => {
            format!("{}/{}", config.remote_base_url, last_path_segment(&descriptor.url))
        }
        StorageProvider::Other(_) => descriptor.url.clone(),
    }
}

/// Text after the last `/`, or the whole string when there is none.
pub fn last_path_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
