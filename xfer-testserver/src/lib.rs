//! Local HTTP fixture server for exercising transfer sessions end to end.
//!
//! Serves a handful of deterministic routes and counts what it observed, so
//! tests can assert both on the response a session saw and on the request
//! the server received. [`TestServer::start`] is blocking and runs the
//! server on its own thread with its own runtime, so it is usable from
//! plain `#[test]` functions that drive a blocking client.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HELLO: &str = "/hello";
pub const PATH_ECHO: &str = "/echo";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_QP: &str = "/qp";
pub const PATH_REDIR_A: &str = "/redir/a";
pub const PATH_REDIR_B: &str = "/redir/b";
pub const PATH_TEAPOT: &str = "/teapot";
pub const PATH_STATS: &str = "/stats";

pub const HELLO_BODY: &str = "Hello World!";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    saw_post_header: Arc<AtomicU64>,
    saw_post_body: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_saw_post_header(&self) {
        self.saw_post_header.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_saw_post_body(&self) {
        self.saw_post_body.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn saw_post_header(&self) -> u64 {
        self.saw_post_header.load(Ordering::Relaxed)
    }

    pub fn saw_post_body(&self) -> u64 {
        self.saw_post_body.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub hello: String,
    pub echo: String,
    pub slow: String,
    pub qp: String,
    pub redir_a: String,
    pub teapot: String,
    pub stats: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            hello: format!("{base_url}{PATH_HELLO}"),
            echo: format!("{base_url}{PATH_ECHO}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            qp: format!("{base_url}{PATH_QP}"),
            redir_a: format!("{base_url}{PATH_REDIR_A}"),
            teapot: format!("{base_url}{PATH_TEAPOT}"),
            stats: format!("{base_url}{PATH_STATS}"),
            base_url,
        }
    }
}

async fn handle_hello(State(stats): State<TestServerStats>) -> Response {
    stats.inc_requests_total();
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        HELLO_BODY,
    )
        .into_response()
}

async fn handle_slow(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    sleep(Duration::from_millis(200)).await;
    "slow"
}

async fn handle_echo(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    stats.inc_requests_total();

    if headers.get("x-test").and_then(|v| v.to_str().ok()) == Some("1") {
        stats.inc_saw_post_header();
    }
    if body.as_ref() == b"ping" {
        stats.inc_saw_post_body();
    }

    (StatusCode::OK, body)
}

async fn handle_qp(
    State(stats): State<TestServerStats>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    stats.inc_requests_total();

    if query.get("foo").map(String::as_str) == Some("bar") {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn handle_redir_a(State(stats): State<TestServerStats>) -> Redirect {
    stats.inc_requests_total();
    Redirect::to(PATH_REDIR_B)
}

async fn handle_redir_b(State(stats): State<TestServerStats>) -> Redirect {
    stats.inc_requests_total();
    Redirect::to(PATH_HELLO)
}

async fn handle_teapot(State(stats): State<TestServerStats>) -> (StatusCode, &'static str) {
    stats.inc_requests_total();
    (StatusCode::IM_A_TEAPOT, "short and stout")
}

#[derive(Debug, Serialize)]
struct StatsSnapshot {
    requests_total: u64,
    saw_post_header: u64,
    saw_post_body: u64,
}

async fn handle_stats(State(stats): State<TestServerStats>) -> Json<StatsSnapshot> {
    stats.inc_requests_total();
    Json(StatsSnapshot {
        requests_total: stats.requests_total(),
        saw_post_header: stats.saw_post_header(),
        saw_post_body: stats.saw_post_body(),
    })
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_HELLO, get(handle_hello))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_ECHO, post(handle_echo))
        .route(PATH_QP, get(handle_qp))
        .route(PATH_REDIR_A, get(handle_redir_a))
        .route(PATH_REDIR_B, get(handle_redir_b))
        .route(PATH_TEAPOT, get(handle_teapot))
        .route(PATH_STATS, get(handle_stats))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    /// Bind an ephemeral port and serve on a dedicated thread. Returns once
    /// the listener is accepting connections.
    pub fn start() -> std::io::Result<Self> {
        let stats = TestServerStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (addr_tx, addr_rx) = std::sync::mpsc::channel::<std::io::Result<SocketAddr>>();

        let thread = std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = addr_tx.send(Err(e));
                    return;
                }
            };
            runtime.block_on(async move {
                let listener = match TcpListener::bind("127.0.0.1:0").await {
                    Ok(l) => l,
                    Err(e) => {
                        let _ = addr_tx.send(Err(e));
                        return;
                    }
                };
                match listener.local_addr() {
                    Ok(addr) => {
                        let _ = addr_tx.send(Ok(addr));
                    }
                    Err(e) => {
                        let _ = addr_tx.send(Err(e));
                        return;
                    }
                }
                let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                let _ = serve.await;
            });
        });

        let addr = addr_rx
            .recv()
            .map_err(|_| std::io::Error::other("test server thread died before binding"))??;

        let base_url = format!("http://{addr}");
        let urls = TestServerUrls::new(base_url.clone());

        Ok(Self {
            addr,
            base_url,
            urls,
            stats,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
