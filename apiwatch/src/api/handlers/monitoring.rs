//! Handlers for monitoring configuration, manual checks, results, statistics,
//! and reports.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::AppState;
use crate::errors::Error;
use crate::inventory::Endpoint;
use crate::monitor::models::{MonitorConfig, MonitoringReport, ProbeResult, RollingStats, RunSummary};

// Query parameters for filtering results
#[derive(Deserialize, IntoParams)]
pub struct ResultsQuery {
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

#[derive(Deserialize, IntoParams)]
pub struct StatsQuery {
    /// Window size override; defaults to the endpoint's configured window
    window: Option<usize>,
}

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

/// Statistics for one endpoint. `stats` is null until at least one check has run.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub endpoint_id: Uuid,
    pub window: usize,
    pub stats: Option<RollingStats>,
}

/// One row of the monitoring overview.
#[derive(Debug, Serialize, ToSchema)]
pub struct OverviewEntry {
    pub endpoint: Endpoint,
    pub config: MonitorConfig,
    pub last_result: Option<ProbeResult>,
    pub open_alerts: usize,
}

/// Get the monitoring configuration in effect for an endpoint
#[utoipa::path(
    get,
    path = "/endpoints/{id}/monitoring",
    tag = "monitoring",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "Monitoring configuration (stored or defaults)", body = MonitorConfig),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn get_monitoring_config(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MonitorConfig>, Error> {
    state.engine.inventory().get(id).await?;
    Ok(Json(state.engine.config_for(id).await))
}

/// Set the monitoring configuration for an endpoint
#[utoipa::path(
    put,
    path = "/endpoints/{id}/monitoring",
    tag = "monitoring",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    request_body = MonitorConfig,
    responses(
        (status = 200, description = "Configuration stored", body = MonitorConfig),
        (status = 400, description = "Configuration failed validation"),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn set_monitoring_config(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(config): Json<MonitorConfig>,
) -> Result<Json<MonitorConfig>, Error> {
    Ok(Json(state.engine.set_config(id, config).await?))
}

/// Run a check for one endpoint now, bypassing the schedule
#[utoipa::path(
    post,
    path = "/endpoints/{id}/check",
    tag = "monitoring",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "Check executed", body = ProbeResult),
        (status = 404, description = "Endpoint not found"),
        (status = 409, description = "A check for this endpoint is already in progress"),
    )
)]
pub async fn check_endpoint(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ProbeResult>, Error> {
    Ok(Json(state.engine.check_endpoint(id).await?))
}

/// Check every active endpoint now, regardless of interval
#[utoipa::path(
    post,
    path = "/monitoring/run",
    tag = "monitoring",
    responses((status = 200, description = "Run summary", body = RunSummary))
)]
pub async fn run_monitoring(State(state): State<AppState>) -> Result<Json<RunSummary>, Error> {
    Ok(Json(state.engine.run_all().await))
}

/// Get probe results for an endpoint, newest first
#[utoipa::path(
    get,
    path = "/endpoints/{id}/results",
    tag = "monitoring",
    params(("id" = Uuid, Path, description = "Endpoint ID"), ResultsQuery),
    responses(
        (status = 200, description = "Probe results", body = Vec<ProbeResult>),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<ProbeResult>>, Error> {
    state.engine.inventory().get(id).await?;
    let results = state
        .engine
        .history()
        .results(id, query.start_time, query.end_time, query.limit.unwrap_or(100))
        .await;
    Ok(Json(results))
}

/// Get rolling statistics for an endpoint
#[utoipa::path(
    get,
    path = "/endpoints/{id}/statistics",
    tag = "monitoring",
    params(("id" = Uuid, Path, description = "Endpoint ID"), StatsQuery),
    responses(
        (status = 200, description = "Rolling statistics", body = StatisticsResponse),
        (status = 400, description = "Invalid window"),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn get_statistics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatisticsResponse>, Error> {
    state.engine.inventory().get(id).await?;
    let window = match query.window {
        Some(0) => {
            return Err(Error::BadRequest {
                message: "window must be at least 1".to_string(),
            });
        }
        Some(w) => w,
        None => state.engine.config_for(id).await.window,
    };
    let stats = state.engine.history().stats(id, window).await;
    Ok(Json(StatisticsResponse {
        endpoint_id: id,
        window,
        stats,
    }))
}

/// Current status of every endpoint: config, last result, open alert count
#[utoipa::path(
    get,
    path = "/monitoring/overview",
    tag = "monitoring",
    responses((status = 200, description = "Per-endpoint monitoring overview", body = Vec<OverviewEntry>))
)]
pub async fn get_overview(State(state): State<AppState>) -> Result<Json<Vec<OverviewEntry>>, Error> {
    let mut entries = Vec::new();
    for endpoint in state.engine.inventory().list(false).await {
        let config = state.engine.config_for(endpoint.id).await;
        let last_result = state.engine.history().last_result(endpoint.id).await;
        let open_alerts = state.engine.alerts().open_kinds(endpoint.id).await.len();
        entries.push(OverviewEntry {
            endpoint,
            config,
            last_result,
            open_alerts,
        });
    }
    Ok(Json(entries))
}

/// Aggregated per-endpoint report over an optional time range
#[utoipa::path(
    get,
    path = "/monitoring/report",
    tag = "monitoring",
    params(ReportQuery),
    responses((status = 200, description = "Monitoring report", body = MonitoringReport))
)]
pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<MonitoringReport>, Error> {
    Ok(Json(state.engine.report(query.start_time, query.end_time).await))
}
