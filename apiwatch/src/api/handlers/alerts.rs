//! Handlers for alert listing and resolution.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::AppState;
use crate::errors::Error;
use crate::monitor::alerts::AlertFilter;
use crate::monitor::models::{Alert, AlertKind, AlertState};

// Query parameters for filtering alerts
#[derive(Deserialize, IntoParams)]
pub struct AlertsQuery {
    endpoint_id: Option<Uuid>,
    kind: Option<AlertKind>,
    state: Option<AlertState>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveAllResponse {
    /// Number of alerts transitioned to resolved
    pub resolved: usize,
}

/// List alerts, most recently opened first
#[utoipa::path(
    get,
    path = "/alerts",
    tag = "alerts",
    params(AlertsQuery),
    responses((status = 200, description = "Alerts matching the filter", body = Vec<Alert>))
)]
pub async fn list_alerts(State(state): State<AppState>, Query(query): Query<AlertsQuery>) -> Result<Json<Vec<Alert>>, Error> {
    let alerts = state
        .engine
        .alerts()
        .list(AlertFilter {
            endpoint_id: query.endpoint_id,
            kind: query.kind,
            state: query.state,
        })
        .await;
    Ok(Json(alerts))
}

/// Resolve the open alert of one kind for an endpoint
#[utoipa::path(
    post,
    path = "/endpoints/{id}/alerts/{kind}/resolve",
    tag = "alerts",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID"),
        ("kind" = AlertKind, Path, description = "Alert kind"),
    ),
    responses(
        (status = 200, description = "Alert resolved", body = Alert),
        (status = 404, description = "No open alert of this kind for the endpoint"),
    )
)]
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, AlertKind)>,
) -> Result<Json<Alert>, Error> {
    state.engine.inventory().get(id).await?;
    let alert = state.engine.alerts().resolve(id, kind).await.ok_or_else(|| Error::NotFound {
        resource: format!("Open {kind} alert"),
        id: id.to_string(),
    })?;
    Ok(Json(alert))
}

/// Resolve every open alert in one operation
#[utoipa::path(
    post,
    path = "/alerts/resolve-all",
    tag = "alerts",
    responses((status = 200, description = "All open alerts resolved", body = ResolveAllResponse))
)]
pub async fn resolve_all_alerts(State(state): State<AppState>) -> Result<Json<ResolveAllResponse>, Error> {
    let resolved = state.engine.resolve_all_alerts().await;
    Ok(Json(ResolveAllResponse { resolved }))
}
