//! The call state machine.
//!
//! One call moves through
//!
//! ```text
//! RESOLVING -> PARSING -> BUILDING_HEADERS -> DISPATCHING(1)
//!     -> { RETRY -> DISPATCHING(n + 1) }* -> TERMINAL
//! ```
//!
//! [`CallMachine`] implements every transition and emits every trace event,
//! but performs no I/O. A driver asks it for the request of the current
//! attempt, performs the transport call however it likes (blocking or
//! awaiting), and feeds the outcome back. Both orchestrator entry points are
//! such drivers, which is what keeps them observably equivalent.
//!
//! # Example
//!
//! ```
//! use relaykit_core::{CallContext, EndpointRegistry, EndpointSpec, InMemoryTraceSink};
//! use relaykit_core::{TransportResponse, headers::HeaderMap};
//! use relaykit_runtime::{EngineSnapshot, machine::{CallMachine, Step}};
//! use uuid::Uuid;
//!
//! let spec = EndpointSpec::builder("ok", "GET", "/ok").build()?;
//! let snapshot = EngineSnapshot::new(EndpointRegistry::new([spec])?, HeaderMap::new());
//! let sink = InMemoryTraceSink::new();
//!
//! let mut step = CallMachine::start(&sink, Uuid::new_v4(), &snapshot, &CallContext::new(), "ok", None);
//! let result = loop {
//!     match step {
//!         Step::Dispatch(machine) => {
//!             let _request = machine.begin_attempt();
//!             step = machine.complete_attempt(Ok(TransportResponse::new(200, r#"{"a":1}"#)));
//!         }
//!         Step::Finished(result) => break result,
//!     }
//! };
//!
//! assert!(result.ok);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::metrics::{CallMetrics, RetryReason};
use crate::snapshot::EngineSnapshot;
use relaykit_core::trace::event_types;
use relaykit_core::{
    CallContext, CallError, CallResult, EndpointSpec, PayloadCodec, TracePayload, TraceSink,
    TransportError, TransportRequest, TransportResult, headers,
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// What the driver must do next.
#[derive(Debug)]
pub enum Step<'s> {
    /// Perform one transport attempt with this machine.
    Dispatch(CallMachine<'s>),
    /// The call is over.
    Finished(CallResult),
}

/// Emits events tagged with one call id.
#[derive(Clone, Copy)]
struct Emitter<'s> {
    sink: &'s dyn TraceSink,
    call_id: Uuid,
}

impl Emitter<'_> {
    fn emit(self, endpoint: &str, event_type: &str, fields: Value) {
        let mut payload = TracePayload::new();
        payload.insert("endpoint".to_string(), Value::from(endpoint));
        if let Value::Object(extra) = fields {
            payload.extend(extra);
        }
        self.sink.emit(self.call_id, event_type, &payload);
    }
}

/// A resolved call waiting for (or between) dispatch attempts.
pub struct CallMachine<'s> {
    emitter: Emitter<'s>,
    endpoint: Arc<EndpointSpec>,
    request: TransportRequest,
    attempt: u32,
}

impl std::fmt::Debug for CallMachine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallMachine")
            .field("call_id", &self.emitter.call_id)
            .field("endpoint", &self.endpoint.name())
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

impl<'s> CallMachine<'s> {
    /// Run the pre-dispatch stages: resolve, parse the payload, merge headers.
    ///
    /// Returns [`Step::Finished`] if the endpoint is unknown or the payload
    /// is malformed; the transport must not be invoked in that case.
    pub fn start(
        sink: &'s dyn TraceSink,
        call_id: Uuid,
        snapshot: &EngineSnapshot,
        ctx: &CallContext,
        endpoint_name: &str,
        raw_payload: Option<&str>,
    ) -> Step<'s> {
        let emitter = Emitter { sink, call_id };

        // Resolve
        emitter.emit(endpoint_name, event_types::RESOLVE_START, Value::Null);
        let Some(endpoint) = snapshot.registry().get(endpoint_name) else {
            let error = CallError::UnknownEndpoint;
            emitter.emit(
                endpoint_name,
                event_types::RESOLVE_ERROR,
                json!({ "error": error.to_string() }),
            );
            return Step::Finished(CallResult::failure(error));
        };
        emitter.emit(endpoint_name, event_types::RESOLVE_DONE, Value::Null);
        tracing::debug!(url = endpoint.url(), "Endpoint resolved");

        // Parse
        // A literal `null` payload sends no body, same as an absent one
        let json_body = match raw_payload.map(PayloadCodec::decode).transpose() {
            Ok(body) => body.filter(|value| !value.is_null()),
            Err(e) => {
                let error = CallError::BadPayload;
                emitter.emit(
                    endpoint_name,
                    event_types::PAYLOAD_ERROR,
                    json!({ "error": error.to_string(), "message": e.message() }),
                );
                return Step::Finished(CallResult::failure(error));
            }
        };

        // Build headers
        let merged = headers::merge(
            snapshot.default_headers(),
            endpoint.static_headers(),
            ctx.headers(),
        );
        let header_fields: serde_json::Map<String, Value> = merged
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        emitter.emit(
            endpoint_name,
            event_types::REQUEST_BUILD,
            json!({
                "method": endpoint.method(),
                "url": endpoint.url(),
                "headers": header_fields,
            }),
        );

        let request = TransportRequest {
            method: endpoint.method().to_string(),
            url: endpoint.url().to_string(),
            headers: merged,
            json_body,
            timeout: endpoint.timeout(),
        };

        Step::Dispatch(Self {
            emitter,
            endpoint,
            request,
            attempt: 1,
        })
    }

    /// The attempt about to be (or being) dispatched, starting at 1.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The endpoint this call resolved to.
    #[must_use]
    pub const fn endpoint(&self) -> &Arc<EndpointSpec> {
        &self.endpoint
    }

    /// Record the start of the current attempt and return its request.
    ///
    /// Call exactly once per attempt, immediately before the transport.
    #[must_use]
    pub fn begin_attempt(&self) -> &TransportRequest {
        self.emit(event_types::REQUEST_START, json!({ "attempt": self.attempt }));
        CallMetrics::record_dispatch(self.endpoint.name());
        tracing::debug!(attempt = self.attempt, "Dispatching");
        &self.request
    }

    /// Feed back the transport outcome of the current attempt.
    ///
    /// Timeouts are retried while `attempt <= max_retries`; any other
    /// transport failure ends the call immediately whatever budget remains.
    #[must_use]
    pub fn complete_attempt(mut self, outcome: TransportResult) -> Step<'s> {
        let attempt = self.attempt;
        let max_retries = self.endpoint.max_retries();
        // Attempt number of the retry, if the budget allows one
        let next_attempt = attempt
            .checked_add(1)
            .filter(|_| attempt <= max_retries);

        let response = match outcome {
            Ok(response) => response,
            Err(TransportError::Timeout) => {
                self.emit(
                    event_types::REQUEST_ERROR,
                    json!({ "attempt": attempt, "category": "timeout" }),
                );
                let Some(next) = next_attempt else {
                    return Step::Finished(CallResult::failure(CallError::Timeout));
                };
                tracing::warn!(attempt, max_retries, "Attempt timed out, retrying");
                CallMetrics::record_retry(self.endpoint.name(), RetryReason::Timeout);
                self.attempt = next;
                return Step::Dispatch(self);
            }
            Err(TransportError::Failed(message)) => {
                self.emit(
                    event_types::REQUEST_ERROR,
                    json!({ "attempt": attempt, "category": "network_error", "message": message }),
                );
                return Step::Finished(CallResult::failure(CallError::NetworkError));
            }
        };

        let status = response.status;
        self.emit(
            event_types::REQUEST_END,
            json!({ "attempt": attempt, "status": status }),
        );

        if let Some(next) = next_attempt.filter(|_| self.endpoint.is_retryable_status(status)) {
            self.emit(
                event_types::REQUEST_RETRY,
                json!({ "attempt": attempt, "status": status }),
            );
            tracing::warn!(attempt, max_retries, status, "Retryable status, retrying");
            CallMetrics::record_retry(self.endpoint.name(), RetryReason::Status);
            self.attempt = next;
            return Step::Dispatch(self);
        }

        Step::Finished(self.classify(status, response.body))
    }

    fn classify(&self, status: u16, body: relaykit_core::ResponseBody) -> CallResult {
        let data = match PayloadCodec::normalize_body(body) {
            Ok(data) => data,
            Err(e) => {
                self.emit(
                    event_types::RESPONSE_ERROR,
                    json!({
                        "status": status,
                        "category": "bad_response_json",
                        "message": e.message(),
                    }),
                );
                return CallResult::response_failure(status, None, CallError::BadResponseJson);
            }
        };

        if (200..300).contains(&status) {
            self.emit(event_types::RESPONSE_OK, json!({ "status": status }));
            CallResult::success(status, data)
        } else {
            self.emit(
                event_types::RESPONSE_ERROR,
                json!({ "status": status, "category": "upstream_error" }),
            );
            CallResult::response_failure(status, Some(data), CallError::UpstreamError(status))
        }
    }

    fn emit(&self, event_type: &str, fields: Value) {
        self.emitter.emit(self.endpoint.name(), event_type, fields);
    }
}
