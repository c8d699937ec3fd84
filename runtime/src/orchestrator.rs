//! The request orchestrator.
//!
//! [`RequestOrchestrator`] owns a transport, a trace sink and the current
//! [`EngineSnapshot`]. It exposes two entry points with identical semantics:
//!
//! - [`RequestOrchestrator::execute_blocking`] runs the whole call on the
//!   calling thread.
//! - [`RequestOrchestrator::execute_non_blocking`] is a single logical task
//!   that suspends only while awaiting the transport.
//!
//! Both drive the same [`CallMachine`], so for the same transport behaviour
//! they return the same [`CallResult`] and emit the same trace sequence.
//!
//! # Reconfiguration
//!
//! The snapshot lives behind an [`ArcSwap`]. A call loads it once when it
//! starts; [`RequestOrchestrator::reconfigure`] replaces it atomically and
//! only affects calls that start afterwards.

use crate::machine::{CallMachine, Step};
use crate::metrics::CallMetrics;
use crate::snapshot::EngineSnapshot;
use arc_swap::ArcSwap;
use relaykit_core::{CallContext, CallError, CallResult, TraceSink, Transport};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Dispatches calls to named endpoints through a transport.
///
/// `Send + Sync` whenever the transport is; share it with `Arc`.
///
/// # Example
///
/// ```
/// use relaykit_core::{CallContext, EndpointRegistry, EndpointSpec, InMemoryTraceSink};
/// use relaykit_core::{Transport, TransportRequest, TransportResponse, TransportResult};
/// use relaykit_core::headers::HeaderMap;
/// use relaykit_runtime::{EngineSnapshot, RequestOrchestrator};
/// use std::sync::Arc;
///
/// struct Echo;
///
/// impl Transport for Echo {
///     fn blocking_request(&self, request: &TransportRequest) -> TransportResult {
///         Ok(TransportResponse::new(200, request.json_body.clone().unwrap_or_default()))
///     }
///
///     async fn suspending_request(&self, request: &TransportRequest) -> TransportResult {
///         self.blocking_request(request)
///     }
/// }
///
/// let spec = EndpointSpec::builder("echo", "POST", "https://example.com/echo").build()?;
/// let snapshot = EngineSnapshot::new(EndpointRegistry::new([spec])?, HeaderMap::new());
/// let sink = InMemoryTraceSink::new();
/// let orchestrator = RequestOrchestrator::new(snapshot, Echo, Arc::new(sink.clone()));
///
/// let result = orchestrator.execute_blocking(&CallContext::new(), "echo", Some(r#"{"n":1}"#));
/// assert!(result.ok);
/// assert_eq!(result.data, Some(serde_json::json!({"n": 1})));
/// assert_eq!(sink.event_types().last().map(String::as_str), Some("response.ok"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RequestOrchestrator<T> {
    snapshot: ArcSwap<EngineSnapshot>,
    transport: T,
    sink: Arc<dyn TraceSink>,
}

impl<T> std::fmt::Debug for RequestOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("endpoints", &self.snapshot.load().registry().names())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RequestOrchestrator<T> {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(snapshot: EngineSnapshot, transport: T, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            transport,
            sink,
        }
    }

    /// Run one call on the calling thread.
    ///
    /// `raw_payload` of `None` sends no body; `Some` is decoded as JSON
    /// first, and a decode failure ends the call with `bad_payload`.
    pub fn execute_blocking(
        &self,
        ctx: &CallContext,
        endpoint_name: &str,
        raw_payload: Option<&str>,
    ) -> CallResult {
        let call_id = ctx.call_id().unwrap_or_else(Uuid::new_v4);
        let span = call_span(endpoint_name, call_id, "blocking");
        let _enter = span.enter();

        let started = Instant::now();
        let snapshot = self.snapshot.load_full();
        let mut step = CallMachine::start(
            self.sink.as_ref(),
            call_id,
            &snapshot,
            ctx,
            endpoint_name,
            raw_payload,
        );

        let result = loop {
            match step {
                Step::Dispatch(machine) => {
                    let outcome = self.transport.blocking_request(machine.begin_attempt());
                    step = machine.complete_attempt(outcome);
                }
                Step::Finished(result) => break result,
            }
        };

        finish(&result, started);
        result
    }

    /// Run one call as a task that suspends only on the transport.
    ///
    /// Same contract as [`Self::execute_blocking`]. Dropping the future
    /// abandons the call; cancelling the in-flight attempt is up to the
    /// transport.
    pub async fn execute_non_blocking(
        &self,
        ctx: &CallContext,
        endpoint_name: &str,
        raw_payload: Option<&str>,
    ) -> CallResult {
        let call_id = ctx.call_id().unwrap_or_else(Uuid::new_v4);
        let span = call_span(endpoint_name, call_id, "non_blocking");

        async move {
            let started = Instant::now();
            let snapshot = self.snapshot.load_full();
            let mut step = CallMachine::start(
                self.sink.as_ref(),
                call_id,
                &snapshot,
                ctx,
                endpoint_name,
                raw_payload,
            );

            let result = loop {
                match step {
                    Step::Dispatch(machine) => {
                        let outcome = self
                            .transport
                            .suspending_request(machine.begin_attempt())
                            .await;
                        step = machine.complete_attempt(outcome);
                    }
                    Step::Finished(result) => break result,
                }
            };

            finish(&result, started);
            result
        }
        .instrument(span)
        .await
    }

    /// Atomically replace the registry and default headers.
    ///
    /// Calls already in flight finish against the snapshot they started with.
    pub fn reconfigure(&self, snapshot: EngineSnapshot) {
        let endpoints = snapshot.registry().len();
        self.snapshot.store(Arc::new(snapshot));
        tracing::info!(endpoints, "Orchestrator reconfigured");
    }

    /// The snapshot new calls will use.
    #[must_use]
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.snapshot.load_full()
    }

    /// The transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The trace sink.
    #[must_use]
    pub const fn sink(&self) -> &Arc<dyn TraceSink> {
        &self.sink
    }
}

fn call_span(endpoint: &str, call_id: Uuid, mode: &'static str) -> tracing::Span {
    tracing::info_span!("relaykit_call", endpoint, %call_id, mode)
}

fn finish(result: &CallResult, started: Instant) {
    CallMetrics::record_outcome(result, started.elapsed());

    match result.error {
        None => tracing::debug!(status = ?result.status, "Call succeeded"),
        Some(error @ (CallError::UnknownEndpoint | CallError::BadPayload)) => {
            tracing::info!(%error, "Call rejected");
        }
        Some(error) => tracing::warn!(%error, status = ?result.status, "Call failed"),
    }
}
