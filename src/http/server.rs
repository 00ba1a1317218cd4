//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: health endpoint plus conventional fallback
//! - Wire up middleware (request ID, tracing, timeout, status pages, panics)
//! - Add HSTS outside development
//! - Serve on a listener until shutdown is broadcast

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Environment;
use crate::health::{HealthAggregator, HealthStatus};
use crate::http::controllers::{self, Routes};
use crate::http::middleware::{status_code_pages, track_requests};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::{panic_response, RouteLabel};
use crate::observability::Telemetry;
use crate::services::ECommerceService;

/// HSTS value sent outside development: 30 days.
pub const HSTS_VALUE: &str = "max-age=2592000";

struct AppStateInner {
    services: ECommerceService,
    health: HealthAggregator,
    telemetry: Arc<dyn Telemetry>,
    environment: Environment,
    routes: Routes,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        services: ECommerceService,
        health: HealthAggregator,
        telemetry: Arc<dyn Telemetry>,
        environment: Environment,
        routes: Routes,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                services,
                health,
                telemetry,
                environment,
                routes,
            }),
        }
    }

    pub fn services(&self) -> &ECommerceService {
        &self.inner.services
    }

    pub fn health(&self) -> &HealthAggregator {
        &self.inner.health
    }

    pub fn telemetry(&self) -> &Arc<dyn Telemetry> {
        &self.inner.telemetry
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    pub fn routes(&self) -> &Routes {
        &self.inner.routes
    }
}

/// Inbound server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub health_path: String,
    pub request_timeout: Duration,
}

/// HTTP server for the storefront.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, settings: &ServerSettings) -> Self {
        Self {
            router: Self::build_router(state, settings),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layer order, inside out: panics are caught first, then the request
    /// deadline, then empty error bodies are rendered, then the request is
    /// tracked and traced.
    #[allow(deprecated)]
    fn build_router(state: AppState, settings: &ServerSettings) -> Router {
        let production = !state.environment().is_development();

        let router = Router::new()
            .route(&settings.health_path, get(health_handler))
            .fallback(controllers::dispatch)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TimeoutLayer::new(settings.request_timeout))
            .layer(middleware::from_fn_with_state(state.clone(), status_code_pages))
            .layer(middleware::from_fn_with_state(state.clone(), track_requests))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request.request_id(),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .with_state(state);

        if production {
            router.layer(SetResponseHeaderLayer::if_not_present(
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static(HSTS_VALUE),
            ))
        } else {
            router
        }
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Probe every dependency and answer with the report. Always 200.
async fn health_handler(State(state): State<AppState>) -> Response {
    let report = state.health().check_all().await;
    state.telemetry().track_health(&report);

    if report.status() != HealthStatus::Healthy {
        let failing: Vec<&str> = report
            .entries()
            .iter()
            .filter(|e| e.status != HealthStatus::Healthy)
            .map(|e| e.name.as_str())
            .collect();
        tracing::warn!(status = %report.status(), failing = ?failing, "Dependencies not healthy");
    }

    let mut response = Json(report.to_response()).into_response();
    response
        .extensions_mut()
        .insert(RouteLabel("health".to_string()));
    response
}
