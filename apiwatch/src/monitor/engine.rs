//! Monitoring engine: scheduling, check execution, and alert application.
//!
//! The engine owns the per-endpoint monitoring configuration, the result
//! history, the alert store, and the event log. Each check runs the full
//! pipeline: probe, record, recompute statistics, evaluate thresholds, apply
//! alert actions. A per-endpoint in-flight guard keeps checks for the same
//! endpoint from overlapping, and a semaphore bounds overall parallelism.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MonitoringSettings;
use crate::errors::{Error, Result};
use crate::inventory::{Endpoint, EndpointInventory};
use crate::monitor::alerts::AlertStore;
use crate::monitor::evaluator::{Observation, EvaluatorSettings, evaluate};
use crate::monitor::events::EventLog;
use crate::monitor::history::{ResultHistory, compute_stats};
use crate::monitor::models::{
    AlertAction, EndpointReport, EventCategory, MonitorConfig, MonitoringReport, ProbeResult, RunSummary, Severity,
};
use crate::monitor::prober::Prober;

pub struct MonitorEngine {
    inventory: Arc<EndpointInventory>,
    prober: Arc<dyn Prober>,
    configs: RwLock<HashMap<Uuid, MonitorConfig>>,
    history: ResultHistory,
    alerts: AlertStore,
    events: EventLog,
    /// Endpoints with a check currently in flight
    in_flight: Mutex<HashSet<Uuid>>,
    /// Bounds how many checks run at once across all endpoints
    permits: Arc<Semaphore>,
    evaluator_settings: EvaluatorSettings,
    defaults: MonitorConfig,
    scheduler_tick: Duration,
    max_parallel: usize,
}

impl MonitorEngine {
    pub fn new(inventory: Arc<EndpointInventory>, prober: Arc<dyn Prober>, settings: &MonitoringSettings) -> Self {
        Self {
            inventory,
            prober,
            configs: RwLock::new(HashMap::new()),
            history: ResultHistory::new(settings.max_retained_results),
            alerts: AlertStore::new(),
            events: EventLog::new(),
            in_flight: Mutex::new(HashSet::new()),
            permits: Arc::new(Semaphore::new(settings.max_parallel_checks)),
            evaluator_settings: EvaluatorSettings {
                danger_factor: settings.danger_factor,
                min_consecutive_failures: settings.min_consecutive_failures,
            },
            defaults: settings.defaults.clone(),
            scheduler_tick: settings.scheduler_tick,
            max_parallel: settings.max_parallel_checks,
        }
    }

    pub fn inventory(&self) -> &EndpointInventory {
        &self.inventory
    }

    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    pub fn alerts(&self) -> &AlertStore {
        &self.alerts
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// The monitoring configuration in effect for an endpoint: the stored one,
    /// or the application defaults when none has been set.
    pub async fn config_for(&self, endpoint_id: Uuid) -> MonitorConfig {
        self.configs
            .read()
            .await
            .get(&endpoint_id)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Store a validated monitoring configuration for an endpoint.
    pub async fn set_config(&self, endpoint_id: Uuid, config: MonitorConfig) -> Result<MonitorConfig> {
        // Surface bad values at write time rather than on the next check
        config.validate()?;
        let endpoint = self.inventory.get(endpoint_id).await?;

        self.configs.write().await.insert(endpoint_id, config.clone());
        self.events
            .record(
                EventCategory::Monitoring,
                Severity::Info,
                Some(endpoint_id),
                format!(
                    "Monitoring configured for {}: every {}s, timeout {}s, latency threshold {:.0}ms, error rate threshold {:.0}%, window {}",
                    endpoint.service_name,
                    config.check_interval_secs,
                    config.timeout_secs,
                    config.latency_threshold_ms,
                    config.error_rate_threshold * 100.0,
                    config.window
                ),
            )
            .await;
        Ok(config)
    }

    /// Run a single check for an endpoint, end to end.
    ///
    /// Rejects with [`Error::CheckInProgress`] when a check for the same
    /// endpoint is already running, rather than queueing a second probe.
    pub async fn check_endpoint(&self, endpoint_id: Uuid) -> Result<ProbeResult> {
        let endpoint = self.inventory.get(endpoint_id).await?;

        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(endpoint_id) {
                return Err(Error::CheckInProgress { endpoint_id });
            }
        }

        let outcome = self.check_locked(&endpoint).await;
        self.in_flight.lock().await.remove(&endpoint_id);
        outcome
    }

    /// The check pipeline, run while the endpoint's in-flight guard is held.
    async fn check_locked(&self, endpoint: &Endpoint) -> Result<ProbeResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| anyhow::anyhow!("check semaphore closed: {e}"))?;

        let config = self.config_for(endpoint.id).await;
        // Configs are validated at write time; re-check in case defaults were
        // misconfigured, and skip the endpoint instead of crashing the cycle.
        if let Err(e) = config.validate() {
            warn!(endpoint_id = %endpoint.id, "Skipping check, invalid monitoring config: {e}");
            self.events
                .record(
                    EventCategory::Monitoring,
                    Severity::Warning,
                    Some(endpoint.id),
                    format!("Check skipped for {}: {}", endpoint.service_name, e.user_message()),
                )
                .await;
            return Err(e);
        }

        let result = self
            .prober
            .probe(endpoint, Duration::from_secs(config.timeout_secs))
            .await;

        debug!(
            endpoint_id = %endpoint.id,
            outcome = ?result.outcome,
            status = ?result.status_code,
            latency_ms = ?result.latency_ms,
            "Check completed"
        );

        self.history.record(result.clone()).await;

        let (severity, detail) = if result.outcome.is_success() {
            (
                Severity::Info,
                format!(
                    "HTTP {} in {:.0}ms",
                    result.status_code.unwrap_or_default(),
                    result.latency_ms.unwrap_or_default()
                ),
            )
        } else {
            (Severity::Warning, result.error.clone().unwrap_or_else(|| "failed".to_string()))
        };
        self.events
            .record(
                EventCategory::Monitoring,
                severity,
                Some(endpoint.id),
                format!("Checked {}: {}", endpoint.service_name, detail),
            )
            .await;

        let stats = self.history.stats(endpoint.id, config.window).await;
        let observation = Observation {
            stats: stats.as_ref(),
            last_outcome: Some(result.outcome),
            consecutive_failures: self.history.consecutive_failures(endpoint.id).await,
        };
        let open_kinds = self.alerts.open_kinds(endpoint.id).await;
        let actions = evaluate(&self.evaluator_settings, &config, observation, &open_kinds);
        self.apply_actions(endpoint, actions).await;

        Ok(result)
    }

    async fn apply_actions(&self, endpoint: &Endpoint, actions: Vec<AlertAction>) {
        for action in actions {
            match action {
                AlertAction::Open {
                    kind,
                    severity,
                    threshold,
                    observed,
                    message,
                } => {
                    let (alert, _) = self
                        .alerts
                        .open_or_update(endpoint.id, kind, severity, threshold, observed, message)
                        .await;
                    info!(endpoint_id = %endpoint.id, kind = %kind, severity = ?alert.severity, "Alert opened");
                    self.events
                        .record(
                            EventCategory::Alert,
                            alert.severity,
                            Some(endpoint.id),
                            format!("Alert opened for {} [{}]: {}", endpoint.service_name, kind, alert.message),
                        )
                        .await;
                }
                AlertAction::Update {
                    kind,
                    severity,
                    threshold,
                    observed,
                    message,
                } => {
                    // The open alert seen at evaluation time may have been
                    // resolved through the API in the meantime, in which case
                    // this reopens it; the threshold keeps the row well-formed
                    // either way.
                    let (alert, opened) = self
                        .alerts
                        .open_or_update(endpoint.id, kind, severity, threshold, observed, message)
                        .await;
                    if opened {
                        info!(endpoint_id = %endpoint.id, kind = %kind, severity = ?alert.severity, "Alert opened");
                        self.events
                            .record(
                                EventCategory::Alert,
                                alert.severity,
                                Some(endpoint.id),
                                format!("Alert opened for {} [{}]: {}", endpoint.service_name, kind, alert.message),
                            )
                            .await;
                    } else {
                        debug!(endpoint_id = %endpoint.id, kind = %kind, observed, severity = ?alert.severity, "Alert updated");
                    }
                }
                AlertAction::Resolve { kind } => {
                    if self.alerts.resolve(endpoint.id, kind).await.is_some() {
                        info!(endpoint_id = %endpoint.id, kind = %kind, "Alert resolved");
                        self.events
                            .record(
                                EventCategory::Alert,
                                Severity::Info,
                                Some(endpoint.id),
                                format!("Alert resolved for {} [{}]", endpoint.service_name, kind),
                            )
                            .await;
                    }
                }
            }
        }
    }

    /// Check every active endpoint now, regardless of interval.
    pub async fn run_all(self: &Arc<Self>) -> RunSummary {
        let endpoints = self.inventory.list(true).await;
        let total = endpoints.len();
        info!("Manual monitoring run started for {total} active endpoints");

        let results: Vec<Result<ProbeResult>> = futures::stream::iter(endpoints.into_iter().map(|endpoint| {
            let engine = Arc::clone(self);
            async move { engine.check_endpoint(endpoint.id).await }
        }))
        .buffer_unordered(self.max_parallel)
        .collect()
        .await;

        let mut summary = RunSummary {
            total,
            successful: 0,
            failed: 0,
            skipped: 0,
        };
        for result in results {
            match result {
                Ok(r) if r.outcome.is_success() => summary.successful += 1,
                Ok(_) => summary.failed += 1,
                Err(e) => {
                    debug!("Check skipped during run: {e}");
                    summary.skipped += 1;
                }
            }
        }

        self.events
            .record(
                EventCategory::Monitoring,
                Severity::Info,
                None,
                format!(
                    "Monitoring run completed: {} checked, {} ok, {} failing, {} skipped",
                    summary.total, summary.successful, summary.failed, summary.skipped
                ),
            )
            .await;
        summary
    }

    /// Resolve every open alert and record the bulk operation in the event log.
    pub async fn resolve_all_alerts(&self) -> usize {
        let resolved = self.alerts.resolve_all().await;
        if resolved > 0 {
            self.events
                .record(
                    EventCategory::Alert,
                    Severity::Info,
                    None,
                    format!("Bulk resolve: {resolved} open alerts resolved"),
                )
                .await;
        }
        resolved
    }

    async fn is_due(&self, endpoint: &Endpoint, now: DateTime<Utc>) -> bool {
        let config = self.config_for(endpoint.id).await;
        match self.history.last_checked_at(endpoint.id).await {
            None => true,
            Some(last) => (now - last).num_seconds() >= config.check_interval_secs as i64,
        }
    }

    /// One scheduler pass: check every active endpoint whose interval has elapsed.
    pub async fn run_due(self: &Arc<Self>) {
        let now = Utc::now();
        let mut due = Vec::new();
        for endpoint in self.inventory.list(true).await {
            if self.is_due(&endpoint, now).await {
                due.push(endpoint);
            }
        }
        if due.is_empty() {
            return;
        }

        debug!("Scheduler pass: {} endpoints due", due.len());
        futures::stream::iter(due.into_iter().map(|endpoint| {
            let engine = Arc::clone(self);
            async move {
                match engine.check_endpoint(endpoint.id).await {
                    Ok(_) => {}
                    Err(Error::CheckInProgress { .. }) => {
                        debug!(endpoint_id = %endpoint.id, "Check already in flight, leaving for next cycle");
                    }
                    Err(e) => {
                        warn!(endpoint_id = %endpoint.id, "Scheduled check failed: {e}");
                    }
                }
            }
        }))
        .buffer_unordered(self.max_parallel)
        .collect::<Vec<()>>()
        .await;
    }

    /// Scheduler loop. Scans for due endpoints every tick until cancelled.
    pub async fn run_daemon(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            "Monitoring scheduler started (tick every {:?}, up to {} parallel checks)",
            self.scheduler_tick, self.max_parallel
        );
        let mut interval = tokio::time::interval(self.scheduler_tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Monitoring scheduler shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.run_due().await;
                }
            }
        }
    }

    /// Per-endpoint summary over an optional time range, derived from result
    /// and alert history.
    pub async fn report(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> MonitoringReport {
        let mut sections = Vec::new();
        for endpoint in self.inventory.list(false).await {
            let results = self.history.results(endpoint.id, start, end, usize::MAX).await;
            let stats = compute_stats(&results);
            let alerts_opened = self.alerts.opened_in_range(endpoint.id, start, end).await;
            sections.push(EndpointReport {
                endpoint_id: endpoint.id,
                service_name: endpoint.service_name,
                url: endpoint.url,
                checks: stats.count,
                availability_pct: stats.availability_pct,
                error_rate: stats.error_rate,
                avg_latency_ms: stats.avg_latency_ms,
                alerts_opened,
            });
        }
        MonitoringReport {
            generated_at: Utc::now(),
            start,
            end,
            endpoints: sections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::EndpointCreate;
    use crate::monitor::models::{AlertKind, AlertState, ProbeOutcome};
    use crate::monitor::alerts::AlertFilter;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Prober that replays a per-endpoint script of outcomes. Endpoints with no
    /// script (or an exhausted one) succeed with a fixed low latency.
    struct ScriptedProber {
        script: Mutex<HashMap<Uuid, VecDeque<(ProbeOutcome, Option<u16>, Option<f64>)>>>,
    }

    impl ScriptedProber {
        fn new() -> Self {
            Self {
                script: Mutex::new(HashMap::new()),
            }
        }

        async fn push(&self, endpoint_id: Uuid, outcome: ProbeOutcome, status: Option<u16>, latency_ms: Option<f64>) {
            self.script
                .lock()
                .await
                .entry(endpoint_id)
                .or_default()
                .push_back((outcome, status, latency_ms));
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, endpoint: &Endpoint, _timeout: Duration) -> ProbeResult {
            let scripted = self
                .script
                .lock()
                .await
                .get_mut(&endpoint.id)
                .and_then(|q| q.pop_front())
                .unwrap_or((ProbeOutcome::Success, Some(200), Some(50.0)));
            ProbeResult {
                endpoint_id: endpoint.id,
                checked_at: Utc::now(),
                outcome: scripted.0,
                status_code: scripted.1,
                latency_ms: scripted.2,
                error: if scripted.0.is_success() { None } else { Some("scripted failure".to_string()) },
            }
        }
    }

    /// Prober that parks until probed at least once, to hold a check in flight.
    struct SlowProber {
        delay: Duration,
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, endpoint: &Endpoint, _timeout: Duration) -> ProbeResult {
            tokio::time::sleep(self.delay).await;
            ProbeResult {
                endpoint_id: endpoint.id,
                checked_at: Utc::now(),
                outcome: ProbeOutcome::Success,
                status_code: Some(200),
                latency_ms: Some(10.0),
                error: None,
            }
        }
    }

    fn settings() -> MonitoringSettings {
        MonitoringSettings {
            scheduler_tick: Duration::from_millis(10),
            ..Default::default()
        }
    }

    async fn engine_with(prober: Arc<dyn Prober>) -> (Arc<MonitorEngine>, Endpoint) {
        let inventory = Arc::new(EndpointInventory::new());
        let endpoint = inventory
            .create(EndpointCreate {
                service_name: "billing-api".to_string(),
                method: crate::inventory::HttpMethod::Get,
                url: "https://billing.example.com/health".to_string(),
                classification: crate::inventory::Classification::Internal,
                auth_kind: None,
            })
            .await
            .unwrap();
        let engine = Arc::new(MonitorEngine::new(inventory, prober, &settings()));
        (engine, endpoint)
    }

    #[tokio::test]
    async fn high_latency_sequence_opens_warning_alert() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober.clone()).await;
        engine
            .set_config(
                endpoint.id,
                MonitorConfig {
                    latency_threshold_ms: 1000.0,
                    window: 3,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for latency in [1200.0, 1300.0, 1100.0] {
            prober.push(endpoint.id, ProbeOutcome::Success, Some(200), Some(latency)).await;
            engine.check_endpoint(endpoint.id).await.unwrap();
        }

        let open = engine
            .alerts()
            .list(AlertFilter {
                state: Some(AlertState::Open),
                ..Default::default()
            })
            .await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].kind, AlertKind::Latency);
        assert_eq!(open[0].severity, Severity::Warning);
        assert!((open[0].observed - 1200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn latency_alert_resolves_when_average_recovers() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober.clone()).await;
        engine
            .set_config(
                endpoint.id,
                MonitorConfig {
                    latency_threshold_ms: 1000.0,
                    window: 3,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for latency in [1200.0, 1300.0, 1100.0] {
            prober.push(endpoint.id, ProbeOutcome::Success, Some(200), Some(latency)).await;
            engine.check_endpoint(endpoint.id).await.unwrap();
        }
        // Window slides to [1300, 1100, 500]; the average drops under 1000ms
        prober.push(endpoint.id, ProbeOutcome::Success, Some(200), Some(500.0)).await;
        engine.check_endpoint(endpoint.id).await.unwrap();

        let alerts = engine.alerts().list(AlertFilter::default()).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].state, AlertState::Resolved);
        assert!(alerts[0].resolved_at.is_some());
    }

    #[tokio::test]
    async fn error_rate_alert_opens_with_observed_value() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober.clone()).await;
        engine
            .set_config(
                endpoint.id,
                MonitorConfig {
                    error_rate_threshold: 0.10,
                    window: 10,
                    // Keep latency alerting out of the way
                    latency_threshold_ms: 100_000.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for _ in 0..8 {
            prober.push(endpoint.id, ProbeOutcome::Success, Some(200), Some(50.0)).await;
        }
        prober.push(endpoint.id, ProbeOutcome::Failure, Some(500), Some(60.0)).await;
        prober.push(endpoint.id, ProbeOutcome::Failure, Some(502), Some(70.0)).await;
        for _ in 0..10 {
            engine.check_endpoint(endpoint.id).await.unwrap();
        }

        let open = engine
            .alerts()
            .list(AlertFilter {
                state: Some(AlertState::Open),
                kind: Some(AlertKind::ErrorRate),
                ..Default::default()
            })
            .await;
        assert_eq!(open.len(), 1);
        assert!((open[0].observed - 0.20).abs() < 1e-9);
        assert_eq!(open[0].threshold, 0.10);
    }

    #[tokio::test]
    async fn concurrent_manual_checks_conflict() {
        let prober = Arc::new(SlowProber {
            delay: Duration::from_millis(200),
        });
        let (engine, endpoint) = engine_with(prober).await;

        let (first, second) = tokio::join!(engine.check_endpoint(endpoint.id), engine.check_endpoint(endpoint.id));

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(Error::CheckInProgress { .. })))
        );
    }

    #[tokio::test]
    async fn endpoint_is_checkable_again_after_conflict() {
        let prober = Arc::new(SlowProber {
            delay: Duration::from_millis(50),
        });
        let (engine, endpoint) = engine_with(prober).await;

        let (first, second) = tokio::join!(engine.check_endpoint(endpoint.id), engine.check_endpoint(endpoint.id));
        assert!(first.is_ok() != second.is_ok());

        // The guard was released; a later check proceeds normally
        assert!(engine.check_endpoint(endpoint.id).await.is_ok());
    }

    #[tokio::test]
    async fn availability_alert_after_consecutive_failures_and_recovery() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober.clone()).await;

        for _ in 0..3 {
            prober.push(endpoint.id, ProbeOutcome::Timeout, None, None).await;
            engine.check_endpoint(endpoint.id).await.unwrap();
        }

        let open = engine.alerts().open_kinds(endpoint.id).await;
        assert!(open.contains(&AlertKind::Availability));

        // One success resolves it immediately
        prober.push(endpoint.id, ProbeOutcome::Success, Some(200), Some(30.0)).await;
        engine.check_endpoint(endpoint.id).await.unwrap();
        let open = engine.alerts().open_kinds(endpoint.id).await;
        assert!(!open.contains(&AlertKind::Availability));
    }

    #[tokio::test]
    async fn run_all_summarizes_outcomes() {
        let prober = Arc::new(ScriptedProber::new());
        let inventory = Arc::new(EndpointInventory::new());
        let healthy = inventory
            .create(EndpointCreate {
                service_name: "healthy".to_string(),
                method: crate::inventory::HttpMethod::Get,
                url: "https://healthy.example.com".to_string(),
                classification: crate::inventory::Classification::External,
                auth_kind: None,
            })
            .await
            .unwrap();
        let broken = inventory
            .create(EndpointCreate {
                service_name: "broken".to_string(),
                method: crate::inventory::HttpMethod::Get,
                url: "https://broken.example.com".to_string(),
                classification: crate::inventory::Classification::External,
                auth_kind: None,
            })
            .await
            .unwrap();
        let inactive = inventory
            .create(EndpointCreate {
                service_name: "inactive".to_string(),
                method: crate::inventory::HttpMethod::Get,
                url: "https://inactive.example.com".to_string(),
                classification: crate::inventory::Classification::External,
                auth_kind: None,
            })
            .await
            .unwrap();
        inventory.set_active(inactive.id, false).await.unwrap();

        prober.push(healthy.id, ProbeOutcome::Success, Some(200), Some(40.0)).await;
        prober.push(broken.id, ProbeOutcome::Failure, Some(500), Some(40.0)).await;

        let engine = Arc::new(MonitorEngine::new(inventory, prober, &settings()));
        let summary = engine.run_all().await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn daemon_checks_due_endpoints_until_cancelled() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober).await;

        let shutdown = CancellationToken::new();
        let daemon = tokio::spawn(Arc::clone(&engine).run_daemon(shutdown.clone()));

        // Never-checked endpoints are due on the first tick
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        daemon.await.unwrap();

        assert!(engine.history().last_result(endpoint.id).await.is_some());
    }

    #[tokio::test]
    async fn daemon_skips_endpoints_inside_their_interval() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober).await;

        // First check happens immediately; interval of 300s keeps it from repeating
        engine.check_endpoint(endpoint.id).await.unwrap();
        let first = engine.history().last_result(endpoint.id).await.unwrap();

        let shutdown = CancellationToken::new();
        let daemon = tokio::spawn(Arc::clone(&engine).run_daemon(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        daemon.await.unwrap();

        let latest = engine.history().last_result(endpoint.id).await.unwrap();
        assert_eq!(latest.checked_at, first.checked_at);
    }

    #[tokio::test]
    async fn invalid_stored_config_skips_check() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober).await;

        // Bypass set_config validation to simulate a config that went bad
        engine.configs.write().await.insert(
            endpoint.id,
            MonitorConfig {
                window: 0,
                ..Default::default()
            },
        );

        let err = engine.check_endpoint(endpoint.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(engine.history().last_result(endpoint.id).await.is_none());
    }

    #[tokio::test]
    async fn set_config_rejects_invalid_and_missing_endpoint() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober).await;

        let invalid = MonitorConfig {
            window: 0,
            ..Default::default()
        };
        assert!(matches!(
            engine.set_config(endpoint.id, invalid).await,
            Err(Error::InvalidConfig { .. })
        ));

        assert!(matches!(
            engine.set_config(Uuid::new_v4(), MonitorConfig::default()).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn report_aggregates_history_and_alerts() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober.clone()).await;
        engine
            .set_config(
                endpoint.id,
                MonitorConfig {
                    latency_threshold_ms: 100.0,
                    window: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        prober.push(endpoint.id, ProbeOutcome::Success, Some(200), Some(200.0)).await;
        prober.push(endpoint.id, ProbeOutcome::Failure, Some(500), Some(300.0)).await;
        engine.check_endpoint(endpoint.id).await.unwrap();
        engine.check_endpoint(endpoint.id).await.unwrap();

        let report = engine.report(None, None).await;
        assert_eq!(report.endpoints.len(), 1);
        let section = &report.endpoints[0];
        assert_eq!(section.checks, 2);
        assert!((section.availability_pct - 50.0).abs() < 1e-9);
        assert!(section.alerts_opened >= 1);
        assert!(section.avg_latency_ms.is_some());
    }

    #[tokio::test]
    async fn update_after_external_resolve_reopens_well_formed_alert() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober.clone()).await;

        for latency in [1200.0, 1300.0, 1100.0] {
            prober.push(endpoint.id, ProbeOutcome::Success, Some(200), Some(latency)).await;
            engine.check_endpoint(endpoint.id).await.unwrap();
        }
        assert!(engine.alerts().open_kinds(endpoint.id).await.contains(&AlertKind::Latency));

        // An API caller resolves the alert between evaluation and apply; the
        // pending update must reopen a complete row, not corrupt one.
        engine.alerts().resolve(endpoint.id, AlertKind::Latency).await.unwrap();
        engine
            .apply_actions(
                &endpoint,
                vec![AlertAction::Update {
                    kind: AlertKind::Latency,
                    severity: Severity::Warning,
                    threshold: 1000.0,
                    observed: 1200.0,
                    message: "still over".to_string(),
                }],
            )
            .await;

        let open = engine
            .alerts()
            .list(AlertFilter {
                state: Some(AlertState::Open),
                kind: Some(AlertKind::Latency),
                ..Default::default()
            })
            .await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].threshold, 1000.0);

        let alert_events = engine
            .events()
            .list(
                crate::monitor::events::EventFilter {
                    category: Some(EventCategory::Alert),
                    endpoint_id: Some(endpoint.id),
                },
                100,
            )
            .await;
        // First open, the external resolve is not logged by the store, reopen
        let opened_entries = alert_events.iter().filter(|e| e.message.contains("Alert opened")).count();
        assert_eq!(opened_entries, 2);
    }

    #[tokio::test]
    async fn resolve_all_alerts_logs_bulk_event() {
        let prober = Arc::new(ScriptedProber::new());
        let (engine, endpoint) = engine_with(prober.clone()).await;

        for _ in 0..3 {
            prober.push(endpoint.id, ProbeOutcome::Timeout, None, None).await;
            engine.check_endpoint(endpoint.id).await.unwrap();
        }
        assert!(!engine.alerts().open_kinds(endpoint.id).await.is_empty());

        let resolved = engine.resolve_all_alerts().await;
        assert!(resolved >= 1);
        assert!(engine.alerts().open_kinds(endpoint.id).await.is_empty());
    }
}
