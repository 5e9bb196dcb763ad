//! Append-only event log.
//!
//! One entry is recorded per check executed and per alert state transition,
//! plus endpoint lifecycle changes. Entries are never mutated; the only
//! destructive operation is an explicit bulk clear.

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::monitor::models::{EventCategory, EventLogEntry, Severity};

/// Filter for listing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
    pub endpoint_id: Option<Uuid>,
}

pub struct EventLog {
    entries: RwLock<Vec<EventLogEntry>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn record(
        &self,
        category: EventCategory,
        severity: Severity,
        endpoint_id: Option<Uuid>,
        message: impl Into<String>,
    ) {
        let entry = EventLogEntry {
            at: Utc::now(),
            category,
            severity,
            endpoint_id,
            message: message.into(),
        };
        self.entries.write().await.push(entry);
    }

    /// List events matching the filter, newest first, capped at `limit`.
    pub async fn list(&self, filter: EventFilter, limit: usize) -> Vec<EventLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| filter.category.is_none_or(|c| e.category == c))
            .filter(|e| filter.endpoint_id.is_none_or(|id| e.endpoint_id == Some(id)))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Remove all entries. Returns the number removed.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_lists_newest_first() {
        let log = EventLog::new();
        log.record(EventCategory::Monitoring, Severity::Info, None, "first").await;
        log.record(EventCategory::Alert, Severity::Warning, None, "second").await;

        let events = log.list(EventFilter::default(), 100).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "second");
    }

    #[tokio::test]
    async fn filters_by_category_and_endpoint() {
        let log = EventLog::new();
        let id = Uuid::new_v4();
        log.record(EventCategory::Monitoring, Severity::Info, Some(id), "check").await;
        log.record(EventCategory::Alert, Severity::Danger, Some(id), "alert").await;
        log.record(EventCategory::Alert, Severity::Danger, None, "other").await;

        let alerts = log
            .list(
                EventFilter {
                    category: Some(EventCategory::Alert),
                    endpoint_id: Some(id),
                },
                100,
            )
            .await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "alert");
    }

    #[tokio::test]
    async fn clear_empties_the_log() {
        let log = EventLog::new();
        log.record(EventCategory::Discovery, Severity::Info, None, "registered").await;
        assert_eq!(log.clear().await, 1);
        assert!(log.list(EventFilter::default(), 100).await.is_empty());
    }

    #[tokio::test]
    async fn limit_caps_results() {
        let log = EventLog::new();
        for i in 0..10 {
            log.record(EventCategory::Monitoring, Severity::Info, None, format!("event {i}")).await;
        }
        assert_eq!(log.list(EventFilter::default(), 3).await.len(), 3);
    }
}
