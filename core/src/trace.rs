//! Structured trace events.
//!
//! Every orchestration step emits a [`TraceEvent`]: a type tag (such as
//! `request.start`) plus a JSON payload. The sequence of events for one call
//! is a complete causal record of the path it took through the pipeline.
//!
//! # Immutability
//!
//! [`TraceSink::emit`] receives the payload by reference and the sink stores
//! its own deep copy. Nothing the caller does to its payload afterwards is
//! observable in the stored event, and the in-memory sink only ever hands out
//! clones of what it holds.
//!
//! # Concurrency
//!
//! Sinks are shared by concurrent calls. Appends are atomic per event, each
//! call's own events stay in emission order, and the interleaving across calls
//! is unspecified. Use [`TraceEvent::call_id`] to separate calls.

use crate::environment::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Payload carried by a trace event.
pub type TracePayload = Map<String, Value>;

/// Event type tags emitted by the orchestrator.
///
/// These names are part of the observable contract.
pub mod event_types {
    /// Endpoint lookup started
    pub const RESOLVE_START: &str = "resolve.start";
    /// Endpoint found
    pub const RESOLVE_DONE: &str = "resolve.done";
    /// Endpoint not found (terminal)
    pub const RESOLVE_ERROR: &str = "resolve.error";
    /// Request payload was not valid JSON (terminal)
    pub const PAYLOAD_ERROR: &str = "payload.error";
    /// Headers merged, request ready
    pub const REQUEST_BUILD: &str = "request.build";
    /// Dispatch attempt started
    pub const REQUEST_START: &str = "request.start";
    /// Dispatch attempt returned a response
    pub const REQUEST_END: &str = "request.end";
    /// Dispatch attempt failed in the transport
    pub const REQUEST_ERROR: &str = "request.error";
    /// Response status is retryable and budget remains
    pub const REQUEST_RETRY: &str = "request.retry";
    /// Call succeeded (terminal)
    pub const RESPONSE_OK: &str = "response.ok";
    /// Call failed after a response was received (terminal)
    pub const RESPONSE_ERROR: &str = "response.error";
}

/// One recorded orchestration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    call_id: Uuid,
    event_type: String,
    recorded_at: DateTime<Utc>,
    payload: TracePayload,
}

impl TraceEvent {
    /// Id of the call that emitted this event.
    #[must_use]
    pub const fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// Event type tag, e.g. `request.retry`.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// When the sink recorded the event.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// The stored payload.
    #[must_use]
    pub const fn payload(&self) -> &TracePayload {
        &self.payload
    }

    /// Look up one payload field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }
}

/// Destination for trace events.
pub trait TraceSink: Send + Sync {
    /// Record one event. The sink must copy `payload`; the caller keeps
    /// ownership and may mutate it afterwards.
    fn emit(&self, call_id: Uuid, event_type: &str, payload: &TracePayload);
}

/// Append-only, in-memory trace sink.
///
/// Cloning is cheap and clones share the same log, so a test can keep one
/// handle and give another to the orchestrator.
///
/// # Example
///
/// ```
/// use relaykit_core::trace::{InMemoryTraceSink, TracePayload, TraceSink};
/// use serde_json::json;
/// use uuid::Uuid;
///
/// let sink = InMemoryTraceSink::new();
/// let mut payload = TracePayload::new();
/// payload.insert("endpoint".into(), json!("x"));
///
/// sink.emit(Uuid::new_v4(), "test", &payload);
/// payload.insert("endpoint".into(), json!("y"));
///
/// assert_eq!(sink.events()[0].get("endpoint"), Some(&json!("x")));
/// ```
#[derive(Clone)]
pub struct InMemoryTraceSink {
    events: Arc<RwLock<Vec<TraceEvent>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTraceSink {
    /// Create an empty sink timestamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty sink timestamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            clock,
        }
    }

    /// Snapshot of every stored event, in append order.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events emitted by one call, in emission order.
    #[must_use]
    pub fn events_for(&self, call_id: Uuid) -> Vec<TraceEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.call_id == call_id)
            .cloned()
            .collect()
    }

    /// Type tags of every stored event, in append order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no event has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all stored events (for test isolation).
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for InMemoryTraceSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryTraceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTraceSink")
            .field("events", &self.len())
            .finish_non_exhaustive()
    }
}

impl TraceSink for InMemoryTraceSink {
    fn emit(&self, call_id: Uuid, event_type: &str, payload: &TracePayload) {
        let event = TraceEvent {
            call_id,
            event_type: event_type.to_string(),
            recorded_at: self.clock.now(),
            payload: payload.clone(),
        };
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Sink that forwards every event to `tracing` at debug level.
///
/// Useful in production where the in-memory log would grow without bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTraceSink;

impl TraceSink for LoggingTraceSink {
    fn emit(&self, call_id: Uuid, event_type: &str, payload: &TracePayload) {
        let payload = Value::Object(payload.clone());
        tracing::debug!(%call_id, event_type, %payload, "trace event");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    struct StaticClock(DateTime<Utc>);

    impl Clock for StaticClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn payload(value: Value) -> TracePayload {
        match value {
            Value::Object(map) => map,
            _ => TracePayload::new(),
        }
    }

    #[test]
    fn test_emit_appends_in_order() {
        let sink = InMemoryTraceSink::new();
        let id = Uuid::new_v4();
        sink.emit(id, "a", &TracePayload::new());
        sink.emit(id, "b", &TracePayload::new());
        sink.emit(id, "c", &TracePayload::new());

        assert_eq!(sink.event_types(), vec!["a", "b", "c"]);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_payload_is_copied_on_emit() {
        let sink = InMemoryTraceSink::new();
        let mut original = payload(json!({"endpoint": "x", "meta": {"a": 1}}));
        sink.emit(Uuid::new_v4(), "test", &original);

        original.insert("endpoint".into(), json!("y"));
        if let Some(Value::Object(meta)) = original.get_mut("meta") {
            meta.insert("a".into(), json!(2));
        }

        let stored = &sink.events()[0];
        assert_eq!(stored.get("endpoint"), Some(&json!("x")));
        assert_eq!(stored.get("meta"), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_returned_events_are_detached() {
        let sink = InMemoryTraceSink::new();
        sink.emit(Uuid::new_v4(), "test", &payload(json!({"n": 1})));

        let mut snapshot = sink.events();
        snapshot.clear();

        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_events_for_filters_by_call() {
        let sink = InMemoryTraceSink::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        sink.emit(first, "a", &TracePayload::new());
        sink.emit(second, "b", &TracePayload::new());
        sink.emit(first, "c", &TracePayload::new());

        let types: Vec<String> = sink
            .events_for(first)
            .iter()
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(types, vec!["a", "c"]);
    }

    #[test]
    fn test_clock_stamps_events() {
        let time = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let sink = InMemoryTraceSink::with_clock(Arc::new(StaticClock(time)));
        sink.emit(Uuid::new_v4(), "a", &TracePayload::new());

        assert_eq!(sink.events()[0].recorded_at(), time);
    }

    #[test]
    fn test_clones_share_log_and_clear() {
        let sink = InMemoryTraceSink::new();
        let handle = sink.clone();
        handle.emit(Uuid::new_v4(), "a", &TracePayload::new());
        assert_eq!(sink.len(), 1);

        sink.clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn test_concurrent_emits_preserve_per_call_order() {
        let sink = InMemoryTraceSink::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = sink.clone();
                thread::spawn(move || {
                    let id = Uuid::new_v4();
                    for n in 0..50 {
                        sink.emit(id, "step", &payload(json!({"n": n})));
                    }
                    id
                })
            })
            .collect();

        for handle in handles {
            let id = handle.join().unwrap();
            let ns: Vec<u64> = sink
                .events_for(id)
                .iter()
                .filter_map(|e| e.get("n").and_then(Value::as_u64))
                .collect();
            assert_eq!(ns, (0..50).collect::<Vec<u64>>());
        }
        assert_eq!(sink.len(), 400);
    }

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_logging_sink_writes_payload() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let id = Uuid::new_v4();

        tracing::subscriber::with_default(subscriber, || {
            LoggingTraceSink.emit(id, "request.start", &payload(json!({"attempt": 1})));
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("trace event"));
        assert!(output.contains("request.start"));
        assert!(output.contains(r#"{"attempt":1}"#));
        assert!(output.contains(&id.to_string()));
    }
}
