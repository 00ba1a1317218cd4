//! Status-code pages.
//!
//! An error response (400-599) that reaches this layer with an empty body is
//! re-rendered through the error route: same status, JSON error document.
//! Responses that already carry a body pass through untouched.

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::controllers::error_page;
use crate::http::response::ErrorDetail;
use crate::http::server::AppState;

pub async fn status_code_pages(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    if response.body().size_hint().exact() != Some(0) {
        return response;
    }

    let detail = response.extensions().get::<ErrorDetail>().cloned();
    let (parts, _) = response.into_parts();
    let mut page = error_page(&state, status, detail.map(|d| d.0));

    // keep headers the failing handler set (Retry-After, Allow)
    for (name, value) in parts.headers.iter() {
        if name != axum::http::header::CONTENT_TYPE && name != axum::http::header::CONTENT_LENGTH {
            page.headers_mut().append(name.clone(), value.clone());
        }
    }
    page.extensions_mut().extend(parts.extensions);
    page
}
