//! Registered endpoint inventory.
//!
//! The inventory is the catalog of HTTP endpoints under watch. Endpoints are
//! registered through the API (or seeded at startup) and carry an `active` flag
//! that gates whether the scheduler checks them. State is held in memory behind
//! an async lock and handed to the rest of the application via [`std::sync::Arc`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{Error, Result};

/// HTTP method used when probing an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_reqwest())
    }
}

impl HttpMethod {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Whether an endpoint belongs to our own estate or a third party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Internal,
    External,
}

/// A registered endpoint under watch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Endpoint {
    pub id: Uuid,
    /// Name of the service this endpoint belongs to (e.g., "billing-api")
    pub service_name: String,
    pub method: HttpMethod,
    pub url: String,
    pub classification: Classification,
    /// Authentication scheme the endpoint requires, if known (e.g., "bearer", "api-key").
    /// Informational only; probes are sent unauthenticated.
    pub auth_kind: Option<String>,
    /// Inactive endpoints are skipped by the scheduler but can still be checked manually
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request payload for registering an endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EndpointCreate {
    pub service_name: String,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default = "default_classification")]
    pub classification: Classification,
    #[serde(default)]
    pub auth_kind: Option<String>,
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

fn default_classification() -> Classification {
    Classification::External
}

/// In-memory store of registered endpoints.
pub struct EndpointInventory {
    endpoints: RwLock<HashMap<Uuid, Endpoint>>,
}

impl Default for EndpointInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointInventory {
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new endpoint. The URL must parse and use an http(s) scheme.
    pub async fn create(&self, request: EndpointCreate) -> Result<Endpoint> {
        if request.service_name.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "service_name must not be empty".to_string(),
            });
        }
        let url = Url::parse(&request.url).map_err(|e| Error::BadRequest {
            message: format!("Invalid URL '{}': {e}", request.url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::BadRequest {
                message: format!("Unsupported URL scheme '{}', expected http or https", url.scheme()),
            });
        }

        let endpoint = Endpoint {
            id: Uuid::new_v4(),
            service_name: request.service_name,
            method: request.method,
            url: url.to_string(),
            classification: request.classification,
            auth_kind: request.auth_kind,
            active: true,
            created_at: Utc::now(),
        };

        self.endpoints.write().await.insert(endpoint.id, endpoint.clone());
        Ok(endpoint)
    }

    pub async fn get(&self, id: Uuid) -> Result<Endpoint> {
        self.endpoints.read().await.get(&id).cloned().ok_or_else(|| Error::NotFound {
            resource: "Endpoint".to_string(),
            id: id.to_string(),
        })
    }

    /// List endpoints, oldest first. When `active_only` is set, inactive
    /// endpoints are filtered out.
    pub async fn list(&self, active_only: bool) -> Vec<Endpoint> {
        let mut endpoints: Vec<Endpoint> = self
            .endpoints
            .read()
            .await
            .values()
            .filter(|e| !active_only || e.active)
            .cloned()
            .collect();
        endpoints.sort_by_key(|e| e.created_at);
        endpoints
    }

    /// Flip the active flag. Returns the updated endpoint.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Endpoint> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints.get_mut(&id).ok_or_else(|| Error::NotFound {
            resource: "Endpoint".to_string(),
            id: id.to_string(),
        })?;
        endpoint.active = active;
        Ok(endpoint.clone())
    }
}
