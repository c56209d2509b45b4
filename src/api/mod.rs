// Entry points for embedding applications.

pub mod cache_api;
pub mod simple;

pub use cache_api::VideoCache;
pub use simple::init_tracing;
