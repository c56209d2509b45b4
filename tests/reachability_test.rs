use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use ma_video_cache::engine::reachability::ReachabilitySignal;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let app = Router::new().route("/health", get(|| async { StatusCode::NO_CONTENT }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
            .unwrap();
    });
    (addr, stop_tx, handle)
}

#[tokio::test]
async fn test_reachability_follows_server() {
    let (addr, stop, server) = start_server().await;
    let signal = ReachabilitySignal::new(false);
    let mut rx = signal.subscribe();
    let shutdown = CancellationToken::new();

    let task = signal.spawn_poller(
        format!("http://{}/health", addr),
        POLL_INTERVAL,
        shutdown.clone(),
    );

    timeout(WAIT, rx.wait_for(|online| *online))
        .await
        .expect("never went online")
        .unwrap();
    assert!(signal.is_online());

    stop.send(()).unwrap();
    server.await.unwrap();

    timeout(WAIT, rx.wait_for(|online| !*online))
        .await
        .expect("never went offline")
        .unwrap();
    assert!(!signal.is_online());

    shutdown.cancel();
    timeout(WAIT, task).await.expect("loop kept running").unwrap();
}

#[tokio::test]
async fn test_unreachable_host_reports_offline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let signal = ReachabilitySignal::new(true);
    let mut rx = signal.subscribe();
    let shutdown = CancellationToken::new();
    let task = signal.spawn_poller(format!("http://{}/", addr), POLL_INTERVAL, shutdown.clone());

    timeout(WAIT, rx.wait_for(|online| !*online))
        .await
        .expect("never went offline")
        .unwrap();

    shutdown.cancel();
    timeout(WAIT, task).await.expect("loop kept running").unwrap();
}

#[tokio::test]
async fn test_cancelled_before_first_poll_exits() {
    let signal = ReachabilitySignal::new(true);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let task = signal.spawn_poller(
        "http://127.0.0.1:9/".to_string(),
        Duration::from_secs(60),
        shutdown,
    );
    timeout(WAIT, task).await.expect("loop kept running").unwrap();
    assert!(signal.is_online());
}
