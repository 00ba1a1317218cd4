//! Outbound HTTP plumbing.
//!
//! # Data Flow
//! ```text
//! ECommerceService / UrlHealthCheck
//!     → OutboundRequest (owned, cheap to clone for retries)
//!     → Transport::send
//!     → client.rs (SharedClient: pooled hyper client, recycled per handler lifetime)
//!     → Response<Bytes>
//! ```
//!
//! # Design Decisions
//! - The resilience layer only sees the `Transport` trait
//! - Requests own their body as `Bytes` so a retry re-sends the same payload
//! - Timeouts belong to the caller (executor or health probe), not the transport

pub mod client;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, Response, Uri};

pub use client::{HttpTransport, SharedClient};

/// A request to a dependent service.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    /// A bodiless GET.
    pub fn get(uri: Uri) -> Self {
        Self {
            method: Method::GET,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header, replacing any previous value.
    pub fn with_header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The call target used to key circuit state: the URI authority.
    pub fn target(&self) -> Option<&str> {
        self.uri.authority().map(|a| a.as_str())
    }
}

/// Errors raised by a transport before any response arrives.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Sends one request and returns the buffered response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<Response<Bytes>, TransportError>;
}
