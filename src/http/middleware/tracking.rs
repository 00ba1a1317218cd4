//! Inbound request tracking.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::RequestIdExt;
use crate::http::response::RouteLabel;
use crate::http::server::AppState;

/// Logs every request and reports it to telemetry under its route label.
pub async fn track_requests(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request.request_id().to_string();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();
    let route = response
        .extensions()
        .get::<RouteLabel>()
        .map(|l| l.0.as_str())
        .unwrap_or("unmatched");

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route,
        status = status.as_u16(),
        duration_ms = elapsed.as_millis() as u64,
        "Request completed"
    );
    state
        .telemetry()
        .track_request(method.as_str(), route, status.as_u16(), elapsed);

    response
}
