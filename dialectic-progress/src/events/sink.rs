//! Event sink trait and implementations.

use super::ProgressNotification;
use async_trait::async_trait;
use tracing::{debug, info, Level};

/// Receives outbound progress notifications.
///
/// The store calls `try_emit` after releasing the state lock. Implementations
/// must not block.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event name (e.g., "progress.step_status_changed")
    /// * `data` - Optional event data
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Emits an event without blocking. Never fails; errors are swallowed.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Emits a typed notification without blocking.
    fn notify(&self, notification: &ProgressNotification) {
        self.try_emit(notification.name(), Some(notification.to_data()));
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event_type: &str, data: Option<&serde_json::Value>) {
        if self.level == Level::DEBUG {
            debug!(event_type = %event_type, event_data = ?data, "progress event");
        } else {
            info!(event_type = %event_type, event_data = ?data, "progress event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// Records every event; used by tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<(String, Option<serde_json::Value>)>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the payloads of every event with the given name.
    #[must_use]
    pub fn payloads_named(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.events
            .read()
            .iter()
            .filter(|(name, _)| name == event_type)
            .filter_map(|(_, data)| data.clone())
            .collect()
    }

    /// Returns the number of events with the given name.
    #[must_use]
    pub fn count_named(&self, event_type: &str) -> usize {
        self.events.read().iter().filter(|(name, _)| name == event_type).count()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProgressKey, StepStatus};
    use crate::events::STEP_STATUS_CHANGED;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit("progress.hydrated", None).await;
        sink.try_emit("progress.hydrated", Some(serde_json::json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingEventSink::debug();
        sink.emit("progress.hydrated", Some(serde_json::json!({"buckets": 1}))).await;
        sink.try_emit("progress.hydrated", None);
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("progress.hydrated", None).await;
        sink.notify(&ProgressNotification::StepStatusChanged {
            progress_key: ProgressKey::new("s1", "thesis", 1),
            step_key: "plan".to_string(),
            from: StepStatus::NotStarted,
            to: StepStatus::InProgress,
        });

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count_named(STEP_STATUS_CHANGED), 1);
        let payload = &sink.payloads_named(STEP_STATUS_CHANGED)[0];
        assert_eq!(payload["to"], "in_progress");
        assert_eq!(payload["progress_key"], "s1:thesis:1");

        sink.clear();
        assert!(sink.is_empty());
    }
}
