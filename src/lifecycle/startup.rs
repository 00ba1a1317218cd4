//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (client recycler, metrics exporter)
//! - Serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener is bound by the caller, so tests can use port 0

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::StorefrontConfig;
use crate::health::{HealthAggregator, ProcessHealthCheck, UrlHealthCheck};
use crate::http::controllers::Routes;
use crate::http::{AppState, HttpServer, ServerSettings};
use crate::lifecycle::Shutdown;
use crate::observability::{metrics, select_telemetry, Telemetry};
use crate::resilience::{Policy, ResilientExecutor};
use crate::routing::RoutePatternError;
use crate::services::{ECommerceService, EndpointError};
use crate::upstream::{HttpTransport, SharedClient, Transport};

pub const PRODUCT_SERVICE: &str = "Product Service";
pub const ORDER_SERVICE: &str = "Order Service";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("invalid health probe URI '{0}'")]
    ProbeUri(String),

    #[error("invalid route template: {0}")]
    Route(#[from] RoutePatternError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully wired storefront, ready to serve.
pub struct Application {
    config: StorefrontConfig,
    telemetry: Arc<dyn Telemetry>,
    client: Arc<SharedClient>,
    executor: Arc<ResilientExecutor>,
    server: HttpServer,
}

impl Application {
    pub fn build(config: StorefrontConfig) -> Result<Self, StartupError> {
        let telemetry = select_telemetry(&config.application_settings);

        let client = Arc::new(SharedClient::new(config.http_client.clone()));
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(client.clone()));

        let policy = Policy::from_config(&config.resilience);
        let executor = Arc::new(
            ResilientExecutor::new(transport.clone(), policy, config.resilience.attempt_timeout())
                .with_telemetry(telemetry.clone()),
        );
        tracing::info!(policy = ?policy, "Resilience policy configured");

        let settings = &config.application_settings;
        let services = ECommerceService::new(
            &settings.products_api_endpoint,
            &settings.orders_api_endpoint,
            executor.clone(),
        )?;

        let health = build_health(&config, transport)?;
        let routes = Routes::conventional()?;

        let state = AppState::new(services, health, telemetry.clone(), config.environment, routes);
        let server = HttpServer::new(
            state,
            &ServerSettings {
                health_path: config.health.path.clone(),
                request_timeout: Duration::from_secs(config.timeouts.request_secs),
            },
        );

        tracing::info!(
            environment = ?config.environment,
            products = %settings.products_api_endpoint,
            orders = %settings.orders_api_endpoint,
            "Application built"
        );

        Ok(Self {
            config,
            telemetry,
            client,
            executor,
            server,
        })
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<ResilientExecutor> {
        &self.executor
    }

    /// The assembled router, for in-process requests.
    pub fn router(&self) -> Router {
        self.server.router()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        if self.telemetry.is_enabled() {
            let address = &self.config.observability.metrics_address;
            let addr: SocketAddr = address
                .parse()
                .map_err(|_| StartupError::MetricsAddress(address.clone()))?;
            metrics::init_metrics(addr)?;
        }

        tokio::spawn(self.client.clone().run_recycler(shutdown.subscribe()));

        self.server.run(listener, shutdown.subscribe()).await?;
        Ok(())
    }
}

fn build_health(config: &StorefrontConfig, transport: Arc<dyn Transport>) -> Result<HealthAggregator, StartupError> {
    let timeout = Duration::from_secs(config.health.timeout_secs);
    let settings = &config.application_settings;
    let mut health = HealthAggregator::new(timeout);

    for (name, endpoint) in [
        (PRODUCT_SERVICE, &settings.products_api_endpoint),
        (ORDER_SERVICE, &settings.orders_api_endpoint),
    ] {
        let uri: Uri = endpoint
            .parse()
            .map_err(|_| StartupError::ProbeUri(endpoint.clone()))?;
        health.register(name, Arc::new(UrlHealthCheck::new(uri, transport.clone(), timeout)));
    }

    for monitor in &config.health.process_monitors {
        health.register(monitor.name.clone(), Arc::new(ProcessHealthCheck::new(monitor.process.clone())));
    }

    tracing::debug!(checks = ?health.names().collect::<Vec<_>>(), "Health checks registered");
    Ok(health)
}
