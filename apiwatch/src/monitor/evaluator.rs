//! Threshold evaluation.
//!
//! The evaluator is a pure function from (config, observation, open alerts) to a
//! list of [`AlertAction`]s. It never touches the alert store itself; the engine
//! applies the returned actions in a separate step. This keeps the decision
//! logic testable without any shared state.
//!
//! Three independent conditions are evaluated:
//!
//! - **Latency**: windowed average latency versus the configured threshold.
//! - **Error rate**: windowed error rate versus the configured threshold.
//! - **Availability**: edge-triggered on the run of consecutive failed checks.
//!   A single success resolves it immediately.
//!
//! Windowed conditions are skipped entirely when no statistics are available
//! (no results recorded yet). Missing data is not treated as a healthy signal:
//! existing open alerts are left untouched rather than resolved.

use std::collections::HashSet;

use crate::monitor::models::{AlertAction, AlertKind, MonitorConfig, ProbeOutcome, RollingStats, Severity};

/// Tunables for severity banding and availability alerting.
#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    /// Observed values above `danger_factor * threshold` escalate from warning to danger
    pub danger_factor: f64,
    /// Consecutive failed checks required before an availability alert opens
    pub min_consecutive_failures: u32,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            danger_factor: 1.5,
            min_consecutive_failures: 3,
        }
    }
}

/// Snapshot of an endpoint's current monitoring state, as seen at evaluation time.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// Rolling statistics over the configured window, if any results exist
    pub stats: Option<&'a RollingStats>,
    /// Outcome of the most recent check
    pub last_outcome: Option<ProbeOutcome>,
    /// Current run of consecutive failed checks
    pub consecutive_failures: u32,
}

/// Decide alert actions for one endpoint.
///
/// `open_kinds` is the set of alert kinds currently open for the endpoint; it
/// determines whether a breached condition opens a new alert or updates the
/// existing one, and whether a cleared condition has anything to resolve.
pub fn evaluate(
    settings: &EvaluatorSettings,
    config: &MonitorConfig,
    observation: Observation<'_>,
    open_kinds: &HashSet<AlertKind>,
) -> Vec<AlertAction> {
    let mut actions = Vec::new();

    if let Some(stats) = observation.stats {
        evaluate_latency(settings, config, stats, open_kinds, &mut actions);
        evaluate_error_rate(settings, config, stats, open_kinds, &mut actions);
    }
    evaluate_availability(settings, observation, open_kinds, &mut actions);

    actions
}

/// Severity band for an observed value relative to its threshold. Callers only
/// invoke this once the threshold is breached, so the bands are warning/danger.
fn band(settings: &EvaluatorSettings, observed: f64, threshold: f64) -> Severity {
    if observed > threshold * settings.danger_factor {
        Severity::Danger
    } else {
        Severity::Warning
    }
}

fn push_breach(
    kind: AlertKind,
    severity: Severity,
    threshold: f64,
    observed: f64,
    message: String,
    open_kinds: &HashSet<AlertKind>,
    actions: &mut Vec<AlertAction>,
) {
    if open_kinds.contains(&kind) {
        actions.push(AlertAction::Update {
            kind,
            severity,
            threshold,
            observed,
            message,
        });
    } else {
        actions.push(AlertAction::Open {
            kind,
            severity,
            threshold,
            observed,
            message,
        });
    }
}

fn evaluate_latency(
    settings: &EvaluatorSettings,
    config: &MonitorConfig,
    stats: &RollingStats,
    open_kinds: &HashSet<AlertKind>,
    actions: &mut Vec<AlertAction>,
) {
    // If every result in the window is a timeout or connection failure there is
    // no latency to judge; the error-rate and availability checks cover that.
    let Some(avg) = stats.avg_latency_ms else {
        return;
    };

    if avg > config.latency_threshold_ms {
        let message = format!(
            "Average latency {avg:.0}ms over the last {} checks exceeds threshold {:.0}ms",
            stats.count, config.latency_threshold_ms
        );
        push_breach(
            AlertKind::Latency,
            band(settings, avg, config.latency_threshold_ms),
            config.latency_threshold_ms,
            avg,
            message,
            open_kinds,
            actions,
        );
    } else if open_kinds.contains(&AlertKind::Latency) {
        actions.push(AlertAction::Resolve { kind: AlertKind::Latency });
    }
}

fn evaluate_error_rate(
    settings: &EvaluatorSettings,
    config: &MonitorConfig,
    stats: &RollingStats,
    open_kinds: &HashSet<AlertKind>,
    actions: &mut Vec<AlertAction>,
) {
    if stats.error_rate > config.error_rate_threshold {
        let message = format!(
            "Error rate {:.0}% over the last {} checks exceeds threshold {:.0}%",
            stats.error_rate * 100.0,
            stats.count,
            config.error_rate_threshold * 100.0
        );
        push_breach(
            AlertKind::ErrorRate,
            band(settings, stats.error_rate, config.error_rate_threshold),
            config.error_rate_threshold,
            stats.error_rate,
            message,
            open_kinds,
            actions,
        );
    } else if open_kinds.contains(&AlertKind::ErrorRate) {
        actions.push(AlertAction::Resolve { kind: AlertKind::ErrorRate });
    }
}

fn evaluate_availability(
    settings: &EvaluatorSettings,
    observation: Observation<'_>,
    open_kinds: &HashSet<AlertKind>,
    actions: &mut Vec<AlertAction>,
) {
    match observation.last_outcome {
        Some(outcome) if !outcome.is_success() => {
            if observation.consecutive_failures >= settings.min_consecutive_failures {
                let message = format!(
                    "Endpoint unreachable: {} consecutive failed checks",
                    observation.consecutive_failures
                );
                push_breach(
                    AlertKind::Availability,
                    Severity::Danger,
                    settings.min_consecutive_failures as f64,
                    observation.consecutive_failures as f64,
                    message,
                    open_kinds,
                    actions,
                );
            }
        }
        Some(_) => {
            if open_kinds.contains(&AlertKind::Availability) {
                actions.push(AlertAction::Resolve {
                    kind: AlertKind::Availability,
                });
            }
        }
        None => {}
    }
}
