//! Pooled outbound client with a bounded pool lifetime.
//!
//! # Responsibilities
//! - Own the process-wide hyper client and its connection pool
//! - Replace the pool every handler lifetime so DNS changes are picked up
//! - Stop recycling when shutdown is signalled

use std::error::Error as StdError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HttpClientConfig;
use crate::upstream::{OutboundRequest, Transport, TransportError};

type PooledClient = Client<HttpConnector, Body>;

const USER_AGENT: &str = concat!("storefront/", env!("CARGO_PKG_VERSION"));

/// Upper bound for buffered upstream bodies.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// The shared outbound client.
pub struct SharedClient {
    config: HttpClientConfig,
    current: ArcSwap<PooledClient>,
    generation: AtomicU64,
}

impl SharedClient {
    /// Build the first pool.
    pub fn new(config: HttpClientConfig) -> Self {
        let client = build_client(&config);
        Self {
            config,
            current: ArcSwap::from_pointee(client),
            generation: AtomicU64::new(0),
        }
    }

    /// The client currently in use. Callers holding an older pool finish on it.
    pub fn client(&self) -> Arc<PooledClient> {
        self.current.load_full()
    }

    /// How many times the pool has been replaced.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn handler_lifetime(&self) -> Duration {
        Duration::from_secs(self.config.handler_lifetime_secs)
    }

    /// Swap in a fresh pool.
    pub fn recycle(&self) {
        self.current.store(Arc::new(build_client(&self.config)));
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(generation, "Outbound connection pool recycled");
    }

    /// Recycle the pool every handler lifetime until shutdown.
    pub async fn run_recycler(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let lifetime = self.handler_lifetime();
        let mut ticker = time::interval_at(time::Instant::now() + lifetime, lifetime);

        tracing::info!(lifetime_secs = lifetime.as_secs(), "Client recycler starting");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.recycle(),
                _ = shutdown.recv() => {
                    tracing::info!("Client recycler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn build_client(config: &HttpClientConfig) -> PooledClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
        .pool_timer(TokioTimer::new())
        .build(connector)
}

/// `Transport` backed by the shared client.
#[derive(Clone)]
pub struct HttpTransport {
    shared: Arc<SharedClient>,
}

impl HttpTransport {
    pub fn new(shared: Arc<SharedClient>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Bytes>, TransportError> {
        let mut builder = Request::builder().method(request.method).uri(request.uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
            headers
                .entry(header::USER_AGENT)
                .or_insert(HeaderValue::from_static(USER_AGENT));
        }
        let req = builder
            .body(Body::from(request.body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .shared
            .client()
            .request(req)
            .await
            .map_err(|e| TransportError::Connect(describe(&e)))?;

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(Body::new(body), MAX_BODY_BYTES)
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(Response::from_parts(parts, bytes))
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recycle_swaps_pool() {
        let shared = SharedClient::new(HttpClientConfig::default());
        let before = shared.client();
        shared.recycle();
        let after = shared.client();

        assert_eq!(shared.generation(), 1);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recycler_ticks_and_stops() {
        let shared = Arc::new(SharedClient::new(HttpClientConfig {
            handler_lifetime_secs: 300,
            ..Default::default()
        }));
        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(shared.clone().run_recycler(rx));

        time::sleep(Duration::from_secs(301)).await;
        assert_eq!(shared.generation(), 1);

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(shared.generation(), 2);

        tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(Arc::new(SharedClient::new(HttpClientConfig::default())));
        let uri = format!("http://{}/", addr).parse().unwrap();
        let err = transport.send(OutboundRequest::get(uri)).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
