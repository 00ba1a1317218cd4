//! Typed client for the products and orders APIs.
//!
//! Every call goes through the shared [`ResilientExecutor`], so both APIs
//! get retries and per-authority circuits without any code here.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderValue, Response, Uri};
use url::Url;

use crate::resilience::{ExecutorError, ResilientExecutor};
use crate::upstream::OutboundRequest;

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid {name} endpoint '{value}': {source}")]
    Parse {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} endpoint '{value}' cannot carry a path")]
    NotABase { name: &'static str, value: String },
}

/// Relays catalogue and order reads to the downstream services.
pub struct ECommerceService {
    products: Url,
    orders: Url,
    executor: Arc<ResilientExecutor>,
}

impl ECommerceService {
    pub fn new(products_endpoint: &str, orders_endpoint: &str, executor: Arc<ResilientExecutor>) -> Result<Self, EndpointError> {
        Ok(Self {
            products: parse_base("products", products_endpoint)?,
            orders: parse_base("orders", orders_endpoint)?,
            executor,
        })
    }

    pub fn products_endpoint(&self) -> &Url {
        &self.products
    }

    pub fn orders_endpoint(&self) -> &Url {
        &self.orders
    }

    pub async fn list_products(&self) -> Result<Response<Bytes>, ExecutorError> {
        self.get(&self.products, &["api", "products"]).await
    }

    pub async fn product(&self, id: &str) -> Result<Response<Bytes>, ExecutorError> {
        self.get(&self.products, &["api", "products", id]).await
    }

    pub async fn list_orders(&self) -> Result<Response<Bytes>, ExecutorError> {
        self.get(&self.orders, &["api", "orders"]).await
    }

    pub async fn order(&self, id: &str) -> Result<Response<Bytes>, ExecutorError> {
        self.get(&self.orders, &["api", "orders", id]).await
    }

    async fn get(&self, base: &Url, segments: &[&str]) -> Result<Response<Bytes>, ExecutorError> {
        let uri = resolve(base, segments)?;
        tracing::debug!(uri = %uri, "Calling dependency");
        let request = OutboundRequest::get(uri).with_header("accept", HeaderValue::from_static("application/json"));
        self.executor.execute(request).await
    }
}

fn parse_base(name: &'static str, value: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(value).map_err(|source| EndpointError::Parse {
        name,
        value: value.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(EndpointError::NotABase {
            name,
            value: value.to_string(),
        });
    }
    Ok(url)
}

/// Append path segments to a base URL. Segments are percent-encoded.
fn resolve(base: &Url, segments: &[&str]) -> Result<Uri, ExecutorError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ExecutorError::InvalidRequest(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    url.as_str()
        .parse()
        .map_err(|_| ExecutorError::InvalidRequest(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_paths() {
        let uri = resolve(&base("http://products.local:8081"), &["api", "products"]).unwrap();
        assert_eq!(uri.to_string(), "http://products.local:8081/api/products");

        let nested = resolve(&base("http://gateway/catalog/"), &["api", "products", "7"]).unwrap();
        assert_eq!(nested.to_string(), "http://gateway/catalog/api/products/7");
    }

    #[test]
    fn test_resolve_encodes_ids() {
        let uri = resolve(&base("http://orders"), &["api", "orders", "a/b c"]).unwrap();
        assert_eq!(uri.path(), "/api/orders/a%2Fb%20c");
    }

    #[test]
    fn test_parse_base_rejects_garbage() {
        assert!(matches!(parse_base("products", "not a url"), Err(EndpointError::Parse { .. })));
        assert!(matches!(parse_base("orders", "mailto:ops@example.com"), Err(EndpointError::NotABase { .. })));
    }
}
