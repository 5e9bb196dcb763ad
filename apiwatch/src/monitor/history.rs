//! Probe result history and rolling statistics.
//!
//! Results are retained per endpoint in arrival order, up to a configured cap;
//! the oldest results are evicted first. The history also tracks the current
//! run of consecutive failures, which drives availability alerting.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::monitor::models::{ProbeOutcome, ProbeResult, RollingStats};

/// Compute statistics over a slice of results.
///
/// Latency aggregates only consider results that recorded a latency; an empty
/// slice yields a zero-count stats block with 0.0 error rate.
pub fn compute_stats(results: &[ProbeResult]) -> RollingStats {
    let count = results.len();
    let success_count = results.iter().filter(|r| r.outcome.is_success()).count();
    let failure_count = count - success_count;

    let (error_rate, availability_pct) = if count == 0 {
        (0.0, 0.0)
    } else {
        (
            failure_count as f64 / count as f64,
            success_count as f64 / count as f64 * 100.0,
        )
    };

    let mut latencies: Vec<f64> = results.iter().filter_map(|r| r.latency_ms).collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    let (avg, min, max, p95) = if latencies.is_empty() {
        (None, None, None, None)
    } else {
        let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
        (
            Some(avg),
            Some(latencies[0]),
            Some(latencies[latencies.len() - 1]),
            Some(percentile(&latencies, 0.95)),
        )
    };

    RollingStats {
        count,
        success_count,
        failure_count,
        error_rate,
        availability_pct,
        avg_latency_ms: avg,
        min_latency_ms: min,
        max_latency_ms: max,
        p95_latency_ms: p95,
    }
}

/// Nearest-rank percentile over an ascending-sorted slice. Must not be called
/// with an empty slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = (sorted.len() as f64 * pct).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

struct EndpointHistory {
    results: VecDeque<ProbeResult>,
    consecutive_failures: u32,
    last_checked_at: Option<DateTime<Utc>>,
}

impl EndpointHistory {
    fn new() -> Self {
        Self {
            results: VecDeque::new(),
            consecutive_failures: 0,
            last_checked_at: None,
        }
    }
}

/// In-memory per-endpoint result store.
pub struct ResultHistory {
    inner: RwLock<HashMap<Uuid, EndpointHistory>>,
    max_retained: usize,
}

impl ResultHistory {
    pub fn new(max_retained: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            max_retained,
        }
    }

    /// Append a result, evicting the oldest when the retention cap is reached,
    /// and update the consecutive failure streak.
    pub async fn record(&self, result: ProbeResult) {
        let mut inner = self.inner.write().await;
        let history = inner.entry(result.endpoint_id).or_insert_with(EndpointHistory::new);

        if result.outcome.is_success() {
            history.consecutive_failures = 0;
        } else {
            history.consecutive_failures += 1;
        }
        history.last_checked_at = Some(result.checked_at);

        history.results.push_back(result);
        while history.results.len() > self.max_retained {
            history.results.pop_front();
        }
    }

    /// Rolling statistics over the most recent `window` results. Returns `None`
    /// when no results have been recorded for the endpoint yet.
    pub async fn stats(&self, endpoint_id: Uuid, window: usize) -> Option<RollingStats> {
        let inner = self.inner.read().await;
        let history = inner.get(&endpoint_id)?;
        if history.results.is_empty() {
            return None;
        }
        let skip = history.results.len().saturating_sub(window);
        let recent: Vec<ProbeResult> = history.results.iter().skip(skip).cloned().collect();
        Some(compute_stats(&recent))
    }

    /// Current run of consecutive failed checks (0 after any success).
    pub async fn consecutive_failures(&self, endpoint_id: Uuid) -> u32 {
        self.inner
            .read()
            .await
            .get(&endpoint_id)
            .map(|h| h.consecutive_failures)
            .unwrap_or(0)
    }

    pub async fn last_checked_at(&self, endpoint_id: Uuid) -> Option<DateTime<Utc>> {
        self.inner.read().await.get(&endpoint_id).and_then(|h| h.last_checked_at)
    }

    pub async fn last_result(&self, endpoint_id: Uuid) -> Option<ProbeResult> {
        self.inner
            .read()
            .await
            .get(&endpoint_id)
            .and_then(|h| h.results.back().cloned())
    }

    /// Results in an optional time range, newest first, capped at `limit`.
    pub async fn results(
        &self,
        endpoint_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Vec<ProbeResult> {
        let inner = self.inner.read().await;
        let Some(history) = inner.get(&endpoint_id) else {
            return Vec::new();
        };
        history
            .results
            .iter()
            .rev()
            .filter(|r| start.is_none_or(|s| r.checked_at >= s))
            .filter(|r| end.is_none_or(|e| r.checked_at <= e))
            .take(limit)
            .cloned()
            .collect()
    }
}
