//! Lifecycle event sinks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, Level};

/// Receives pipeline lifecycle events.
///
/// Sinks observe a run; they never influence it. Implementations must not
/// panic and should return quickly.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - One of the names in [`event_types`](super::event_types)
    /// * `data` - Optional event payload
    async fn emit(&self, event_type: &str, data: Option<Value>);

    /// Emits an event from synchronous code.
    fn try_emit(&self, event_type: &str, data: Option<Value>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Writes every event to `tracing`.
///
/// This is the sink a pipeline uses unless another is injected. The payload's
/// `run_id` and `step` are lifted into log fields.
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
    /// Creates a logging sink. Levels other than `DEBUG` log at `INFO`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Shorthand for a `DEBUG` sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, event_type: &str, data: Option<&Value>) {
        let run_id = data.and_then(|d| d.get("run_id")).and_then(Value::as_str);
        let step = data.and_then(|d| d.get("step")).and_then(Value::as_u64);
        if self.level == Level::DEBUG {
            debug!(event_type, run_id, step, payload = ?data, "Pipeline event");
        } else {
            info!(event_type, run_id, step, payload = ?data, "Pipeline event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.log(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.log(event_type, data.as_ref());
    }
}

/// One event captured by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// The event name.
    pub name: String,
    /// The payload as emitted.
    pub data: Option<Value>,
    /// When the sink received it.
    pub received_at: DateTime<Utc>,
}

impl RecordedEvent {
    /// Returns the payload's `run_id`, if any.
    pub fn run_id(&self) -> Option<&str> {
        self.data.as_ref()?.get("run_id")?.as_str()
    }
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything received so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Returns the event names, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.name.clone()).collect()
    }

    /// Returns the events belonging to one run.
    #[must_use]
    pub fn for_run(&self, run_id: &str) -> Vec<RecordedEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.run_id() == Some(run_id))
            .cloned()
            .collect()
    }

    /// Returns the payloads of events with exactly this name.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<Option<Value>> {
        self.events
            .read()
            .iter()
            .filter(|e| e.name == event_type)
            .map(|e| e.data.clone())
            .collect()
    }

    /// Number of events received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// True until the first event arrives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Forgets everything received so far.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.try_emit(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push(RecordedEvent {
            name: event_type.to_string(),
            data,
            received_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_types;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit(event_types::PIPELINE_STARTED, None).await;
        LoggingEventSink::default()
            .emit(event_types::STEP_COMPLETED, Some(json!({"step": 1})))
            .await;
        LoggingEventSink::debug().try_emit(event_types::PIPELINE_COMPLETED, None);
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(event_types::PIPELINE_STARTED, None).await;
        sink.try_emit(event_types::STEP_FALLBACK, Some(json!({"step": 3})));
        sink.emit(event_types::STEP_FALLBACK, Some(json!({"step": 4}))).await;

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.event_types(),
            vec!["pipeline.started", "step.fallback", "step.fallback"]
        );
        assert_eq!(
            sink.events_of_type(event_types::STEP_FALLBACK),
            vec![Some(json!({"step": 3})), Some(json!({"step": 4}))]
        );

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_collecting_sink_filters_by_run() {
        let sink = CollectingEventSink::new();
        sink.emit(event_types::PIPELINE_STARTED, Some(json!({"run_id": "a"}))).await;
        sink.emit(event_types::PIPELINE_STARTED, Some(json!({"run_id": "b"}))).await;
        sink.emit(event_types::PIPELINE_COMPLETED, Some(json!({"run_id": "a"}))).await;
        sink.emit(event_types::PIPELINE_FAILED, None).await;

        let run_a: Vec<String> = sink.for_run("a").into_iter().map(|e| e.name).collect();
        assert_eq!(run_a, vec!["pipeline.started", "pipeline.completed"]);
        assert!(sink.events()[3].run_id().is_none());
        assert!(sink.events()[0].received_at <= sink.events()[2].received_at);
    }
}
