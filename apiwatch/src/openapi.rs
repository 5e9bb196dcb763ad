//! OpenAPI documentation for the monitoring API (`/api/v1/*`).

use utoipa::OpenApi;

use crate::api;
use crate::inventory;
use crate::monitor::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::endpoints::create_endpoint,
        api::handlers::endpoints::list_endpoints,
        api::handlers::endpoints::get_endpoint,
        api::handlers::endpoints::activate_endpoint,
        api::handlers::endpoints::deactivate_endpoint,
        api::handlers::monitoring::get_monitoring_config,
        api::handlers::monitoring::set_monitoring_config,
        api::handlers::monitoring::check_endpoint,
        api::handlers::monitoring::run_monitoring,
        api::handlers::monitoring::get_results,
        api::handlers::monitoring::get_statistics,
        api::handlers::monitoring::get_overview,
        api::handlers::monitoring::get_report,
        api::handlers::alerts::list_alerts,
        api::handlers::alerts::resolve_alert,
        api::handlers::alerts::resolve_all_alerts,
        api::handlers::events::list_events,
        api::handlers::events::clear_events,
    ),
    components(
        schemas(
            inventory::Endpoint,
            inventory::EndpointCreate,
            inventory::HttpMethod,
            inventory::Classification,
            models::MonitorConfig,
            models::ProbeOutcome,
            models::ProbeResult,
            models::RollingStats,
            models::Severity,
            models::AlertKind,
            models::AlertState,
            models::Alert,
            models::EventCategory,
            models::EventLogEntry,
            models::RunSummary,
            models::EndpointReport,
            models::MonitoringReport,
            api::handlers::monitoring::StatisticsResponse,
            api::handlers::monitoring::OverviewEntry,
            api::handlers::alerts::ResolveAllResponse,
            api::handlers::events::ClearEventsResponse,
        )
    ),
    tags(
        (name = "endpoints", description = "Endpoint inventory: registration, listing, and activation."),
        (name = "monitoring", description = "Monitoring configuration, manual checks, probe results, rolling statistics, and reports."),
        (name = "alerts", description = "Threshold alerts raised by the evaluator, with open/resolved state."),
        (name = "events", description = "Append-only audit trail of checks, alert transitions, and endpoint lifecycle changes."),
    ),
    info(
        title = "apiwatch API",
        description = "REST API monitoring and alerting engine. Registered endpoints are probed on a \
            per-endpoint interval; results feed rolling statistics that are evaluated against \
            configurable latency, error-rate, and availability thresholds.",
    )
)]
pub struct ApiDoc;
