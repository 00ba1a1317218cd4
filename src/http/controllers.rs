//! Conventional controllers.
//!
//! # Data Flow
//! ```text
//! Unclaimed request path
//!     → error route (Products/Error/{code}) → error document
//!     → default route ({controller=Products}/{action=Index}/{id?})
//!     → (controller, action) dispatch, case-insensitive
//!     → ECommerceService → relayed JSON or AppError
//! ```
//!
//! Controllers only relay; all resilience lives in the executor.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, Response as HttpResponse, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::http::response::{AppError, ErrorDocument, RouteLabel};
use crate::http::server::AppState;
use crate::resilience::ExecutorError;
use crate::routing::{RoutePattern, RoutePatternError, DEFAULT_ROUTE, ERROR_ROUTE};

/// Compiled conventional routes.
#[derive(Debug, Clone)]
pub struct Routes {
    pub default: RoutePattern,
    pub error: RoutePattern,
}

impl Routes {
    pub fn conventional() -> Result<Self, RoutePatternError> {
        Ok(Self {
            default: RoutePattern::parse(DEFAULT_ROUTE)?,
            error: RoutePattern::parse(ERROR_ROUTE)?,
        })
    }
}

/// Fallback handler for every path without an explicit axum route.
pub async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        return response;
    }

    let path = uri.path();
    if let Some(values) = state.routes().error.matches(path) {
        let code = values
            .get("code")
            .and_then(|c| c.parse::<u16>().ok())
            .and_then(|c| StatusCode::from_u16(c).ok())
            .filter(|s| s.is_client_error() || s.is_server_error());
        let mut response = match code {
            Some(status) => error_page(&state, status, None),
            None => StatusCode::NOT_FOUND.into_response(),
        };
        response
            .extensions_mut()
            .insert(RouteLabel("Products/Error".to_string()));
        return response;
    }

    let Some(values) = state.routes().default.matches(path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let controller = values.get("controller").unwrap_or_default().to_ascii_lowercase();
    let action = values.get("action").unwrap_or_default().to_ascii_lowercase();
    let id = values.get("id");

    let services = state.services();
    let (label, result) = match (controller.as_str(), action.as_str(), id) {
        ("products", "index", _) => ("Products/Index", services.list_products().await),
        ("products", "details", Some(id)) => ("Products/Details", services.product(id).await),
        ("orders", "index", _) => ("Orders/Index", services.list_orders().await),
        ("orders", "details", Some(id)) => ("Orders/Details", services.order(id).await),
        _ => {
            tracing::debug!(controller = %controller, action = %action, "No action matched");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let mut response = relay(result);
    response.extensions_mut().insert(RouteLabel(label.to_string()));
    response
}

/// Relay a dependency's JSON answer, or map its failure.
fn relay(result: Result<HttpResponse<Bytes>, ExecutorError>) -> Response {
    match result {
        Ok(upstream) => {
            let status = upstream.status();
            let body = upstream.into_body();
            (
                status,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                body,
            )
                .into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Render the error document. Detail is shown in development only.
pub fn error_page(state: &AppState, status: StatusCode, detail: Option<String>) -> Response {
    let detail = if state.environment().is_development() {
        detail
    } else {
        None
    };
    ErrorDocument::new(status)
        .with_detail(detail)
        .into_response_with(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_routes_compile() {
        let routes = Routes::conventional().unwrap();
        assert!(routes.default.matches("/").is_some());
        assert!(routes.error.matches("/Products/Error/404").is_some());
        assert!(routes.error.matches("/Products").is_none());
    }

    #[test]
    fn test_relay_sets_json_content_type() {
        let upstream = HttpResponse::builder()
            .status(200)
            .body(Bytes::from_static(b"[]"))
            .unwrap();
        let response = relay(Ok(upstream));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
