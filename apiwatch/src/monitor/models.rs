//! Core monitoring types: per-endpoint configuration, probe results, rolling
//! statistics, alerts, and the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{Error, Result};

/// Per-endpoint monitoring configuration.
///
/// Every endpoint is monitored with either an explicitly stored configuration or
/// the application-wide defaults. All thresholds are validated before being
/// stored; a config that fails validation never reaches the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Seconds between scheduled checks of this endpoint
    pub check_interval_secs: u64,
    /// Seconds to wait for a response before the check counts as timed out
    pub timeout_secs: u64,
    /// Average latency (milliseconds) above which a latency alert is raised
    pub latency_threshold_ms: f64,
    /// Fraction of failed checks (0.0 to 1.0) above which an error-rate alert is raised
    pub error_rate_threshold: f64,
    /// Number of most recent results the rolling statistics are computed over
    pub window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            timeout_secs: 30,
            latency_threshold_ms: 1000.0,
            error_rate_threshold: 0.10,
            window: 10,
        }
    }
}

impl MonitorConfig {
    /// Validate threshold and interval sanity.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(Error::InvalidConfig {
                message: "check_interval_secs must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig {
                message: "timeout_secs must be at least 1".to_string(),
            });
        }
        if !(self.latency_threshold_ms > 0.0) {
            return Err(Error::InvalidConfig {
                message: format!("latency_threshold_ms must be positive, got {}", self.latency_threshold_ms),
            });
        }
        if !(0.0..=1.0).contains(&self.error_rate_threshold) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "error_rate_threshold must be between 0.0 and 1.0, got {}",
                    self.error_rate_threshold
                ),
            });
        }
        if self.window == 0 {
            return Err(Error::InvalidConfig {
                message: "window must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// Response received with a non-error status (2xx or 3xx)
    Success,
    /// Response received with an error status, or the connection failed
    Failure,
    /// No response within the configured timeout
    Timeout,
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success)
    }
}

/// Result of a single check against an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProbeResult {
    pub endpoint_id: Uuid,
    /// When the check was started
    pub checked_at: DateTime<Utc>,
    pub outcome: ProbeOutcome,
    /// HTTP status code, when a response was received
    pub status_code: Option<u16>,
    /// Round-trip time in milliseconds, when a response was received
    pub latency_ms: Option<f64>,
    /// Human-readable failure detail (connection error, HTTP status, timeout)
    pub error: Option<String>,
}

/// Rolling statistics over the most recent results for an endpoint.
///
/// Latency aggregates are computed only over results that recorded a latency;
/// timed-out and connection-failed checks contribute to the error rate but not
/// to the latency figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RollingStats {
    /// Number of results in the window
    pub count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Fraction of non-successful checks in the window (0.0 to 1.0)
    pub error_rate: f64,
    /// Percentage of successful checks in the window (0.0 to 100.0)
    pub availability_pct: f64,
    pub avg_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// The condition an alert tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// Average latency over the window exceeds the threshold
    Latency,
    /// Error rate over the window exceeds the threshold
    ErrorRate,
    /// Consecutive failed checks reached the availability limit
    Availability,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Latency => write!(f, "latency"),
            AlertKind::ErrorRate => write!(f, "error-rate"),
            AlertKind::Availability => write!(f, "availability"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Open,
    Resolved,
}

/// A raised alert.
///
/// At most one open alert exists per (endpoint, kind) pair. While the condition
/// persists the open alert is updated in place; when the condition clears it is
/// marked resolved and a fresh occurrence opens a new alert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub kind: AlertKind,
    pub severity: Severity,
    /// The configured threshold that was crossed
    pub threshold: f64,
    /// The most recent observed value for the tracked condition
    pub observed: f64,
    pub message: String,
    pub state: AlertState,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// What the threshold evaluator decided for one (endpoint, kind) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertAction {
    /// No open alert exists and the condition is breached
    Open {
        kind: AlertKind,
        severity: Severity,
        threshold: f64,
        observed: f64,
        message: String,
    },
    /// An open alert exists and the condition is still breached
    Update {
        kind: AlertKind,
        severity: Severity,
        threshold: f64,
        observed: f64,
        message: String,
    },
    /// An open alert exists and the condition has cleared
    Resolve { kind: AlertKind },
}

/// Category of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Endpoint registration and lifecycle changes
    Discovery,
    /// Checks executed and configuration changes
    Monitoring,
    /// Alert openings and resolutions
    Alert,
}

/// A single entry in the in-memory audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventLogEntry {
    pub at: DateTime<Utc>,
    pub category: EventCategory,
    pub severity: Severity,
    pub endpoint_id: Option<Uuid>,
    pub message: String,
}

/// Summary returned by a manual run over all active endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunSummary {
    /// Active endpoints considered
    pub total: usize,
    /// Checks that completed with a successful probe
    pub successful: usize,
    /// Checks that completed with a failed or timed-out probe
    pub failed: usize,
    /// Endpoints skipped (check already in flight or invalid configuration)
    pub skipped: usize,
}

/// Per-endpoint section of a monitoring report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointReport {
    pub endpoint_id: Uuid,
    pub service_name: String,
    pub url: String,
    /// Checks recorded in the report range
    pub checks: usize,
    pub availability_pct: f64,
    pub error_rate: f64,
    pub avg_latency_ms: Option<f64>,
    /// Alerts opened in the report range
    pub alerts_opened: usize,
}

/// Aggregated monitoring report over an optional time range.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonitoringReport {
    pub generated_at: DateTime<Utc>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub endpoints: Vec<EndpointReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_rejected() {
        let config = MonitorConfig {
            window: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn error_rate_threshold_bounds() {
        let config = MonitorConfig {
            error_rate_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            error_rate_threshold: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            error_rate_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn timeout_may_exceed_interval() {
        // Overlap is prevented by the per-endpoint in-flight guard, not the
        // config; a timeout longer than the interval is a valid setting.
        let config = MonitorConfig {
            check_interval_secs: 10,
            timeout_secs: 30,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Danger > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn alert_kind_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&AlertKind::ErrorRate).unwrap(), "\"error-rate\"");
        assert_eq!(serde_json::from_str::<AlertKind>("\"latency\"").unwrap(), AlertKind::Latency);
    }
}
