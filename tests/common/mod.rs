//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use storefront::{Application, Shutdown, StorefrontConfig};

/// What the mock answers to one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A raw-TCP HTTP/1.1 backend answering from a script.
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

/// Start a backend whose reply depends on the zero-based request index and path.
pub async fn start_backend<F>(script: F) -> MockBackend
where
    F: Fn(usize, &str) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let paths = Arc::new(Mutex::new(Vec::new()));
    let script = Arc::new(script);

    {
        let hits = hits.clone();
        let paths = paths.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let hits = hits.clone();
                let paths = paths.clone();
                let script = script.clone();
                tokio::spawn(async move {
                    serve_one(socket, hits, paths, script).await;
                });
            }
        });
    }

    MockBackend { addr, hits, paths }
}

/// A backend that always gives the same reply.
pub async fn start_fixed_backend(reply: Reply) -> MockBackend {
    start_backend(move |_, _| reply.clone()).await
}

async fn serve_one<F>(mut socket: TcpStream, hits: Arc<AtomicUsize>, paths: Arc<Mutex<Vec<String>>>, script: Arc<F>)
where
    F: Fn(usize, &str) -> Reply + Send + Sync + 'static,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let index = hits.fetch_add(1, Ordering::SeqCst);
    paths.lock().unwrap().push(path.clone());

    let reply = script(index, &path);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason(reply.status),
        reply.body.len(),
        reply.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Configuration pointing at the given endpoints, with millisecond backoff.
pub fn test_config(products: &str, orders: &str) -> StorefrontConfig {
    let mut config = StorefrontConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.application_settings.products_api_endpoint = products.into();
    config.application_settings.orders_api_endpoint = orders.into();
    config.resilience.backoff_unit_ms = 1;
    config.resilience.jitter_max_ms = 1;
    config.resilience.attempt_timeout_secs = 2;
    config.health.timeout_secs = 2;
    config
}

/// A running storefront.
pub struct TestApp {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_app(config: StorefrontConfig) -> TestApp {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Application::build(config).unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = app.run(listener, &signal).await;
    });

    TestApp { addr, shutdown }
}
