use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use ma_video_cache::config::CacheConfig;
use ma_video_cache::error::TransferError;
use ma_video_cache::transfer::http::HttpTransfer;
use ma_video_cache::transfer::traits::TransferController;

const TEST_SIZE: usize = 1024 * 1024; // 1 MB
const SLOW_CHUNKS: usize = 200;
const SLOW_CHUNK_SIZE: usize = 4096;

fn test_body() -> Vec<u8> {
    (0..TEST_SIZE).map(|i| (i % 256) as u8).collect()
}

async fn serve_file() -> impl IntoResponse {
    let body = test_body();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_LENGTH, body.len().to_string()),
        ],
        body,
    )
}

/// Streams chunks with a delay so a transfer can be cancelled mid-flight.
async fn serve_slow() -> impl IntoResponse {
    let stream = futures::stream::unfold(0usize, |i| async move {
        if i >= SLOW_CHUNKS {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        Some((Ok::<_, std::io::Error>(Bytes::from(vec![0u8; SLOW_CHUNK_SIZE])), i + 1))
    });
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_LENGTH, (SLOW_CHUNKS * SLOW_CHUNK_SIZE).to_string()),
        ],
        Body::from_stream(stream),
    )
}

/// Chunked response without a content-length.
async fn serve_chunked() -> impl IntoResponse {
    let stream = futures::stream::iter(
        (0..8).map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![1u8; 1024]))),
    );
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
}

async fn serve_missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "gone")
}

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/file", get(serve_file))
        .route("/slow", get(serve_slow))
        .route("/chunked", get(serve_chunked))
        .route("/missing", get(serve_missing));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

#[tokio::test]
async fn test_http_fetch_with_progress() {
    let (addr, _handle) = start_server().await;
    let transfer = HttpTransfer::new(&CacheConfig::default());
    let token = CancellationToken::new();
    let reports = Mutex::new(Vec::new());
    let on_progress = |p: f64| reports.lock().push(p);

    let attachment = transfer
        .fetch(&format!("http://{}/file", addr), &token, &on_progress)
        .await
        .unwrap();

    assert_eq!(attachment.content_type, "video/mp4");
    assert_eq!(&attachment.data[..], &test_body()[..]);

    let reports = reports.into_inner();
    assert!(reports.windows(2).all(|w| w[0] <= w[1]), "{:?}", reports);
    assert!(reports.iter().all(|p| (0.0..100.0).contains(p)), "{:?}", reports);
}

#[tokio::test]
async fn test_http_fetch_unknown_length_reports_nothing() {
    let (addr, _handle) = start_server().await;
    let transfer = HttpTransfer::new(&CacheConfig::default());
    let reports = Mutex::new(Vec::<f64>::new());
    let on_progress = |p: f64| reports.lock().push(p);

    let attachment = transfer
        .fetch(
            &format!("http://{}/chunked", addr),
            &CancellationToken::new(),
            &on_progress,
        )
        .await
        .unwrap();

    assert_eq!(attachment.len(), 8 * 1024);
    // Generic type with an unrecognised payload falls back to the default.
    assert_eq!(attachment.content_type, "video/mp4");
    assert!(reports.lock().is_empty());
}

#[tokio::test]
async fn test_http_fetch_error_status_fails() {
    let (addr, _handle) = start_server().await;
    let transfer = HttpTransfer::new(&CacheConfig::default());

    let err = transfer
        .fetch(
            &format!("http://{}/missing", addr),
            &CancellationToken::new(),
            &|_| {},
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Failed(_)));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_http_fetch_over_limit_fails() {
    let (addr, _handle) = start_server().await;
    let config = CacheConfig {
        max_download_bytes: 1000,
        ..CacheConfig::default()
    };
    let transfer = HttpTransfer::new(&config);

    let err = transfer
        .fetch(&format!("http://{}/file", addr), &CancellationToken::new(), &|_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Failed(_)));
}

#[tokio::test]
async fn test_http_fetch_cancelled_mid_transfer() {
    let (addr, _handle) = start_server().await;
    let transfer = HttpTransfer::new(&CacheConfig::default());
    let token = CancellationToken::new();

    let canceller = token.clone();
    let on_progress = move |p: f64| {
        if p >= 5.0 {
            canceller.cancel();
        }
    };

    let started = std::time::Instant::now();
    let err = transfer
        .fetch(&format!("http://{}/slow", addr), &token, &on_progress)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    // The full body would take about two seconds to stream.
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn test_http_fetch_with_revoked_token_does_not_start() {
    let transfer = HttpTransfer::new(&CacheConfig::default());
    let token = CancellationToken::new();
    token.cancel();

    // Unroutable address: any real request attempt would fail, not cancel.
    let err = transfer
        .fetch("http://127.0.0.1:9/never", &token, &|_| {})
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
