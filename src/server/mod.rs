// Local HTTP server exposing presentable handles to players that need a real URL.

pub mod handler;
