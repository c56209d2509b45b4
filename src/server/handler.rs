// Axum request handler — serves the bytes behind live presentable handles.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::engine::handle::HandleRegistry;

/// Local HTTP server for presentable handles.
///
/// While it runs, the registry mints URLs pointing at it. Stopping it, by
/// [`shutdown`](Self::shutdown) or by dropping it, restores the previous origin.
pub struct MediaServer {
    port: u16,
    handles: Arc<HandleRegistry>,
    previous_origin: Option<String>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MediaServer {
    /// Start serving `handles` on a random local port.
    ///
    /// Handles created after this call get URLs pointing at the server.
    pub async fn start(handles: Arc<HandleRegistry>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let app = Router::new()
            .route("/media/{key}", get(media_handler).head(head_handler))
            .with_state(handles.clone());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let previous_origin = handles.origin();
        handles.set_origin(format!("http://127.0.0.1:{}/media", port));
        info!("media server listening on 127.0.0.1:{}", port);

        Ok(Self {
            port,
            handles,
            previous_origin: Some(previous_origin),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// URL serving the object stored under `key`.
    pub fn url_for_key(&self, key: &str) -> String {
        format!("http://127.0.0.1:{}/media/{}", self.port, key)
    }

    /// Stop the server; new handles fall back to the previous origin.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(origin) = self.previous_origin.take() {
            self.handles.set_origin(origin);
        }
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("media server on port {} stopped", self.port);
        }
    }
}

impl Drop for MediaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Byte range requested by a player, before it is checked against the handle's size.
#[derive(Debug, PartialEq, Eq)]
enum RangeRequest {
    /// `bytes=first-` or `bytes=first-last`, `last` inclusive.
    From { first: u64, last: Option<u64> },
    /// `bytes=-len`: the final `len` bytes.
    Tail { len: u64 },
}

impl RangeRequest {
    /// Read a single-range `Range` header. Anything else means "whole object".
    fn parse(header_value: &str) -> Option<Self> {
        let spec = header_value.trim().strip_prefix("bytes=")?;
        let (first, last) = spec.split_once('-')?;
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            return match last.parse::<u64>().ok()? {
                0 => None,
                len => Some(RangeRequest::Tail { len }),
            };
        }
        let first = first.parse().ok()?;
        let last = match last {
            "" => None,
            l => Some(l.parse().ok()?),
        };
        Some(RangeRequest::From { first, last })
    }

    /// Clamp to an object of `size` bytes as `[start, end)`; `None` when nothing overlaps.
    fn window(&self, size: u64) -> Option<(u64, u64)> {
        let (start, end) = match *self {
            RangeRequest::From { first, last } => {
                let end = last.map_or(size, |l| l.saturating_add(1).min(size));
                (first, end)
            }
            RangeRequest::Tail { len } => (size.saturating_sub(len), size),
        };
        (start < size && start < end).then_some((start, end))
    }
}

fn base_headers(content_type: &str, body_len: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers
}

fn content_range(start: u64, end: u64, total: u64) -> HeaderValue {
    // Content-Range end is inclusive.
    HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end - 1, total))
        .unwrap_or_else(|_| HeaderValue::from_static("bytes */0"))
}

fn not_satisfiable(total: u64) -> Response {
    let value = HeaderValue::from_str(&format!("bytes */{}", total))
        .unwrap_or_else(|_| HeaderValue::from_static("bytes */0"));
    (
        StatusCode::RANGE_NOT_SATISFIABLE,
        [(header::CONTENT_RANGE, value)],
        "range not satisfiable",
    )
        .into_response()
}

/// GET /media/{key} — serve a live handle with Range support.
async fn media_handler(
    State(handles): State<Arc<HandleRegistry>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(attachment) = handles.resolve(&key) else {
        return (StatusCode::NOT_FOUND, "handle not found").into_response();
    };

    let total = attachment.len();
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(RangeRequest::parse);

    let Some(range) = range else {
        debug!("media request key={} full body ({} bytes)", key, total);
        let resp_headers = base_headers(&attachment.content_type, total);
        return (StatusCode::OK, resp_headers, attachment.data).into_response();
    };

    let Some((start, end)) = range.window(total) else {
        return not_satisfiable(total);
    };
    debug!("media request key={} range=[{}, {})", key, start, end);

    let body: Bytes = attachment.data.slice(start as usize..end as usize);
    let mut resp_headers = base_headers(&attachment.content_type, end - start);
    resp_headers.insert(header::CONTENT_RANGE, content_range(start, end, total));
    (StatusCode::PARTIAL_CONTENT, resp_headers, body).into_response()
}

/// HEAD /media/{key} — return headers only.
async fn head_handler(
    State(handles): State<Arc<HandleRegistry>>,
    Path(key): Path<String>,
) -> Response {
    match handles.resolve(&key) {
        Some(attachment) => (
            StatusCode::OK,
            base_headers(&attachment.content_type, attachment.len()),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "handle not found").into_response(),
    }
}
