//! Alert storage.
//!
//! Holds open and resolved alerts and enforces the invariant that at most one
//! open alert exists per (endpoint, kind) pair. Resolved alerts are kept as
//! queryable history and never deleted.

use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::monitor::models::{Alert, AlertKind, AlertState, Severity};

/// Filter for listing alerts. All fields are conjunctive; `None` matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFilter {
    pub endpoint_id: Option<Uuid>,
    pub kind: Option<AlertKind>,
    pub state: Option<AlertState>,
}

/// In-memory alert store.
pub struct AlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        Self {
            alerts: RwLock::new(Vec::new()),
        }
    }

    /// Open an alert, or update the open one for this (endpoint, kind) if it
    /// already exists. Updates refresh the observed value and message; severity
    /// only ever escalates in place and `opened_at` is preserved. The flag is
    /// true when a new row was opened rather than an existing one updated.
    pub async fn open_or_update(
        &self,
        endpoint_id: Uuid,
        kind: AlertKind,
        severity: Severity,
        threshold: f64,
        observed: f64,
        message: String,
    ) -> (Alert, bool) {
        let mut alerts = self.alerts.write().await;

        if let Some(existing) = alerts
            .iter_mut()
            .find(|a| a.endpoint_id == endpoint_id && a.kind == kind && a.state == AlertState::Open)
        {
            existing.severity = existing.severity.max(severity);
            existing.observed = observed;
            existing.message = message;
            return (existing.clone(), false);
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            endpoint_id,
            kind,
            severity,
            threshold,
            observed,
            message,
            state: AlertState::Open,
            opened_at: Utc::now(),
            resolved_at: None,
        };
        alerts.push(alert.clone());
        (alert, true)
    }

    /// Resolve the open alert for this (endpoint, kind), if any. Returns the
    /// resolved alert, or `None` when nothing was open.
    pub async fn resolve(&self, endpoint_id: Uuid, kind: AlertKind) -> Option<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.endpoint_id == endpoint_id && a.kind == kind && a.state == AlertState::Open)?;
        alert.state = AlertState::Resolved;
        alert.resolved_at = Some(Utc::now());
        Some(alert.clone())
    }

    /// Resolve every open alert in one pass. Returns the number resolved.
    ///
    /// Runs under a single write lock, so the operation is atomic: readers see
    /// either no alerts resolved or all of them.
    pub async fn resolve_all(&self) -> usize {
        let mut alerts = self.alerts.write().await;
        let now = Utc::now();
        let mut resolved = 0;
        for alert in alerts.iter_mut().filter(|a| a.state == AlertState::Open) {
            alert.state = AlertState::Resolved;
            alert.resolved_at = Some(now);
            resolved += 1;
        }
        resolved
    }

    /// List alerts matching the filter, most recently opened first.
    pub async fn list(&self, filter: AlertFilter) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        let mut matched: Vec<Alert> = alerts
            .iter()
            .filter(|a| filter.endpoint_id.is_none_or(|id| a.endpoint_id == id))
            .filter(|a| filter.kind.is_none_or(|k| a.kind == k))
            .filter(|a| filter.state.is_none_or(|s| a.state == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        matched
    }

    /// Alert kinds currently open for an endpoint.
    pub async fn open_kinds(&self, endpoint_id: Uuid) -> HashSet<AlertKind> {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|a| a.endpoint_id == endpoint_id && a.state == AlertState::Open)
            .map(|a| a.kind)
            .collect()
    }

    /// Number of alerts for an endpoint opened within an optional time range.
    pub async fn opened_in_range(
        &self,
        endpoint_id: Uuid,
        start: Option<chrono::DateTime<Utc>>,
        end: Option<chrono::DateTime<Utc>>,
    ) -> usize {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|a| a.endpoint_id == endpoint_id)
            .filter(|a| start.is_none_or(|s| a.opened_at >= s))
            .filter(|a| end.is_none_or(|e| a.opened_at <= e))
            .count()
    }
}
