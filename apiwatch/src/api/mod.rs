//! API layer for HTTP request handling.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//!
//! # API Structure
//!
//! The API is divided into several functional areas:
//!
//! - **Endpoints** (`/api/v1/endpoints/*`): Endpoint inventory and activation
//! - **Monitoring** (`/api/v1/endpoints/{id}/monitoring`, `/api/v1/monitoring/*`):
//!   Per-endpoint configuration, manual runs, results, statistics, and reports
//! - **Alerts** (`/api/v1/alerts/*`): Alert listing and resolution
//! - **Events** (`/api/v1/events`): The monitoring audit trail
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! Interactive documentation is served at `/docs` when the server is running.

pub mod handlers;
