//! On-demand local caching of remote video.
//!
//! A [`engine::orchestrator::CacheOrchestrator`] manages one media item through
//! check-cache, download-with-progress, serve-from-cache and evict.

pub mod api;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod server;
pub mod source;
pub mod store;
pub mod transfer;
