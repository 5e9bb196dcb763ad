//! Probe execution: the HTTP request against a monitored endpoint.
//!
//! The prober sends a single request, measures the round trip, and classifies
//! the outcome. It never fails itself; every attempt produces a [`ProbeResult`]
//! so that failures are captured in the history like any other check.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::inventory::Endpoint;
use crate::monitor::models::{ProbeOutcome, ProbeResult};

/// Anything that can check an endpoint and report a classified result.
///
/// Abstracted behind a trait so the engine can be driven by a scripted prober
/// in tests without any network traffic.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint, timeout: Duration) -> ProbeResult;
}

/// Probes endpoints over real HTTP.
pub struct HttpProber {
    client: Client,
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProber {
    /// Create a prober with a default HTTP client. Redirects are followed, so
    /// a 3xx that resolves to a 2xx is observed as the final status.
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &Endpoint, timeout: Duration) -> ProbeResult {
        let checked_at = Utc::now();
        let start = Instant::now();

        let response = self
            .client
            .request(endpoint.method.as_reqwest(), &endpoint.url)
            .timeout(timeout)
            .send()
            .await;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if status < 400 {
                    ProbeResult {
                        endpoint_id: endpoint.id,
                        checked_at,
                        outcome: ProbeOutcome::Success,
                        status_code: Some(status),
                        latency_ms: Some(elapsed_ms),
                        error: None,
                    }
                } else {
                    ProbeResult {
                        endpoint_id: endpoint.id,
                        checked_at,
                        outcome: ProbeOutcome::Failure,
                        status_code: Some(status),
                        latency_ms: Some(elapsed_ms),
                        error: Some(format!("HTTP {status}")),
                    }
                }
            }
            Err(e) if e.is_timeout() => ProbeResult {
                endpoint_id: endpoint.id,
                checked_at,
                outcome: ProbeOutcome::Timeout,
                status_code: None,
                // No response arrived, so there is no meaningful latency to record
                latency_ms: None,
                error: Some(format!("Request timed out after {}s", timeout.as_secs())),
            },
            Err(e) => ProbeResult {
                endpoint_id: endpoint.id,
                checked_at,
                outcome: ProbeOutcome::Failure,
                status_code: None,
                latency_ms: None,
                error: Some(format!("Connection error: {e}")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Classification, HttpMethod};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(url: String) -> Endpoint {
        Endpoint {
            id: Uuid::new_v4(),
            service_name: "test-service".to_string(),
            method: HttpMethod::Get,
            url,
            classification: Classification::External,
            auth_kind: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn classifies_2xx_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpProber::new();
        let result = prober
            .probe(&endpoint(format!("{}/health", server.uri())), Duration::from_secs(5))
            .await;

        assert_eq!(result.outcome, ProbeOutcome::Success);
        assert_eq!(result.status_code, Some(200));
        assert!(result.latency_ms.is_some());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn classifies_5xx_as_failure_with_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let prober = HttpProber::new();
        let result = prober.probe(&endpoint(server.uri()), Duration::from_secs(5)).await;

        assert_eq!(result.outcome, ProbeOutcome::Failure);
        assert_eq!(result.status_code, Some(503));
        // A response arrived, so the round trip is still recorded
        assert!(result.latency_ms.is_some());
        assert_eq!(result.error.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn classifies_slow_response_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let prober = HttpProber::new();
        let result = prober
            .probe(&endpoint(server.uri()), Duration::from_millis(100))
            .await;

        assert_eq!(result.outcome, ProbeOutcome::Timeout);
        assert_eq!(result.status_code, None);
        assert_eq!(result.latency_ms, None);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn classifies_connection_refused_as_failure() {
        // Port 1 on localhost should refuse the connection
        let prober = HttpProber::new();
        let result = prober
            .probe(&endpoint("http://127.0.0.1:1/health".to_string()), Duration::from_secs(2))
            .await;

        assert_eq!(result.outcome, ProbeOutcome::Failure);
        assert_eq!(result.status_code, None);
        assert!(result.error.as_deref().unwrap_or_default().starts_with("Connection error"));
    }
}
