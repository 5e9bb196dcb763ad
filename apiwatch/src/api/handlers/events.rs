//! Handlers for the event log.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::AppState;
use crate::errors::Error;
use crate::monitor::events::EventFilter;
use crate::monitor::models::{EventCategory, EventLogEntry};

// Query parameters for filtering events
#[derive(Deserialize, IntoParams)]
pub struct EventsQuery {
    category: Option<EventCategory>,
    endpoint_id: Option<Uuid>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearEventsResponse {
    /// Number of entries removed
    pub cleared: usize,
}

/// List event log entries, newest first
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    params(EventsQuery),
    responses((status = 200, description = "Event log entries", body = Vec<EventLogEntry>))
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventLogEntry>>, Error> {
    let events = state
        .engine
        .events()
        .list(
            EventFilter {
                category: query.category,
                endpoint_id: query.endpoint_id,
            },
            query.limit.unwrap_or(200),
        )
        .await;
    Ok(Json(events))
}

/// Clear the event log
#[utoipa::path(
    delete,
    path = "/events",
    tag = "events",
    responses((status = 200, description = "Event log cleared", body = ClearEventsResponse))
)]
pub async fn clear_events(State(state): State<AppState>) -> Result<Json<ClearEventsResponse>, Error> {
    let cleared = state.engine.events().clear().await;
    Ok(Json(ClearEventsResponse { cleared }))
}
