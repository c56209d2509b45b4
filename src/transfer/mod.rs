// Transfer controllers — cancellable whole-payload downloads with progress.

pub mod http;
pub mod traits;
