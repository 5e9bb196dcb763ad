//! apiwatch - REST API monitoring and alerting engine.
//!
//! Registered HTTP endpoints are probed on a per-endpoint interval. Each probe
//! result is appended to a rolling history, statistics are recomputed over a
//! configurable window, and thresholds for latency, error rate, and
//! availability are evaluated to open, update, or resolve alerts. Everything is
//! exposed over a REST API under `/api/v1`, with interactive documentation at
//! `/docs`.
//!
//! # Architecture
//!
//! - [`inventory`]: the catalog of endpoints under watch
//! - [`monitor`]: the engine (prober, history, evaluator, alert store, scheduler)
//! - [`api`]: axum handlers for the REST surface
//! - [`config`]: YAML + environment configuration via figment
//!
//! # Lifecycle
//!
//! 1. **Create**: [`Application::new`] builds the engine and starts the
//!    background scheduler
//! 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
//! 3. **Shutdown**: on the shutdown signal, the scheduler is cancelled and
//!    awaited before the process exits

pub mod api;
pub mod config;
pub mod errors;
pub mod inventory;
pub mod monitor;
mod openapi;
pub mod telemetry;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, patch, post},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use config::CorsOrigin;
use monitor::{HttpProber, MonitorEngine, Prober};
use openapi::ApiDoc;

/// Shared state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MonitorEngine>,
    pub config: Config,
}

async fn healthz() -> &'static str {
    "ok"
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any());

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: `/api/v1` routes, health check, and docs.
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/endpoints",
            post(api::handlers::endpoints::create_endpoint).get(api::handlers::endpoints::list_endpoints),
        )
        .route("/endpoints/{id}", get(api::handlers::endpoints::get_endpoint))
        .route("/endpoints/{id}/activate", patch(api::handlers::endpoints::activate_endpoint))
        .route("/endpoints/{id}/deactivate", patch(api::handlers::endpoints::deactivate_endpoint))
        .route(
            "/endpoints/{id}/monitoring",
            get(api::handlers::monitoring::get_monitoring_config).put(api::handlers::monitoring::set_monitoring_config),
        )
        .route("/endpoints/{id}/check", post(api::handlers::monitoring::check_endpoint))
        .route("/endpoints/{id}/results", get(api::handlers::monitoring::get_results))
        .route("/endpoints/{id}/statistics", get(api::handlers::monitoring::get_statistics))
        .route(
            "/endpoints/{id}/alerts/{kind}/resolve",
            post(api::handlers::alerts::resolve_alert),
        )
        .route("/monitoring/run", post(api::handlers::monitoring::run_monitoring))
        .route("/monitoring/overview", get(api::handlers::monitoring::get_overview))
        .route("/monitoring/report", get(api::handlers::monitoring::get_report))
        .route("/alerts", get(api::handlers::alerts::list_alerts))
        .route("/alerts/resolve-all", post(api::handlers::alerts::resolve_all_alerts))
        .route(
            "/events",
            get(api::handlers::events::list_events).delete(api::handlers::events::clear_events),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Container for background services and their lifecycle management.
///
/// Holds the scheduler task handle and the shutdown token. When dropped, the
/// `drop_guard` cancels the token, signaling the scheduler to stop.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        // Signal all background tasks to shutdown
        self.shutdown_token.cancel();

        // Wait for all background tasks to complete
        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Start the monitoring scheduler.
fn setup_background_services(
    engine: Arc<MonitorEngine>,
    shutdown_token: tokio_util::sync::CancellationToken,
) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    let daemon_shutdown = shutdown_token.clone();
    background_tasks.push(tokio::spawn(engine.run_daemon(daemon_shutdown)));

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// The assembled application: router, state, and background scheduler.
pub struct Application {
    router: Router,
    app_state: AppState,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance probing over real HTTP.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_prober(config, Arc::new(HttpProber::new()))
    }

    /// Create an application with a custom prober. Used by tests to drive the
    /// full stack without network traffic.
    pub fn with_prober(config: Config, prober: Arc<dyn Prober>) -> anyhow::Result<Self> {
        let inventory = Arc::new(inventory::EndpointInventory::new());
        let engine = Arc::new(MonitorEngine::new(inventory, prober, &config.monitoring));

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(engine.clone(), shutdown_token);

        let app_state = AppState { engine, config };
        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            app_state,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.app_state.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "apiwatch listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.app_state.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Shutdown background services and wait for tasks to complete
        self.bg_services.shutdown().await;

        Ok(())
    }
}
