//! Handlers for the endpoint inventory.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::AppState;
use crate::errors::Error;
use crate::inventory::{Endpoint, EndpointCreate};
use crate::monitor::models::{EventCategory, Severity};

// Query parameters for filtering endpoints
#[derive(Deserialize, IntoParams)]
pub struct EndpointsQuery {
    /// Pass `active` to list only endpoints the scheduler considers
    status: Option<String>,
}

/// Register a new endpoint
#[utoipa::path(
    post,
    path = "/endpoints",
    tag = "endpoints",
    request_body = EndpointCreate,
    responses(
        (status = 201, description = "Endpoint registered", body = Endpoint),
        (status = 400, description = "Invalid URL or service name"),
    )
)]
pub async fn create_endpoint(
    State(state): State<AppState>,
    Json(request): Json<EndpointCreate>,
) -> Result<(StatusCode, Json<Endpoint>), Error> {
    let endpoint = state.engine.inventory().create(request).await?;
    state
        .engine
        .events()
        .record(
            EventCategory::Discovery,
            Severity::Info,
            Some(endpoint.id),
            format!("Endpoint registered: {} {} {}", endpoint.service_name, endpoint.method, endpoint.url),
        )
        .await;
    Ok((StatusCode::CREATED, Json(endpoint)))
}

/// List endpoints (optionally filtered by ?status=active)
#[utoipa::path(
    get,
    path = "/endpoints",
    tag = "endpoints",
    params(EndpointsQuery),
    responses((status = 200, description = "Registered endpoints", body = Vec<Endpoint>))
)]
pub async fn list_endpoints(
    State(state): State<AppState>,
    Query(query): Query<EndpointsQuery>,
) -> Result<Json<Vec<Endpoint>>, Error> {
    let active_only = matches!(query.status.as_deref(), Some("active"));
    Ok(Json(state.engine.inventory().list(active_only).await))
}

/// Get a single endpoint
#[utoipa::path(
    get,
    path = "/endpoints/{id}",
    tag = "endpoints",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "Endpoint details", body = Endpoint),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn get_endpoint(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Endpoint>, Error> {
    Ok(Json(state.engine.inventory().get(id).await?))
}

/// Activate an endpoint so the scheduler picks it up
#[utoipa::path(
    patch,
    path = "/endpoints/{id}/activate",
    tag = "endpoints",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "Endpoint activated", body = Endpoint),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn activate_endpoint(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Endpoint>, Error> {
    let endpoint = state.engine.inventory().set_active(id, true).await?;
    state
        .engine
        .events()
        .record(
            EventCategory::Discovery,
            Severity::Info,
            Some(id),
            format!("Endpoint activated: {}", endpoint.service_name),
        )
        .await;
    Ok(Json(endpoint))
}

/// Deactivate an endpoint; the scheduler will skip it until reactivated
#[utoipa::path(
    patch,
    path = "/endpoints/{id}/deactivate",
    tag = "endpoints",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "Endpoint deactivated", body = Endpoint),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn deactivate_endpoint(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Endpoint>, Error> {
    let endpoint = state.engine.inventory().set_active(id, false).await?;
    state
        .engine
        .events()
        .record(
            EventCategory::Discovery,
            Severity::Info,
            Some(id),
            format!("Endpoint deactivated: {}", endpoint.service_name),
        )
        .await;
    Ok(Json(endpoint))
}
