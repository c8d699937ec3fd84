//! Scripted transport for deterministic orchestrator tests
//!
//! [`ScriptedTransport`] answers each request with the next outcome queued
//! for its URL and records every invocation. Both the blocking and the
//! suspending operation draw from the same per-URL queue, so one script
//! drives either execution mode identically.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use relaykit_core::{
    ResponseBody, Transport, TransportError, TransportRequest, TransportResponse, TransportResult,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Which transport operation was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// `blocking_request`
    Blocking,
    /// `suspending_request`
    Suspending,
}

/// One recorded transport invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Operation used
    pub mode: CallMode,
    /// Request as received
    pub request: TransportRequest,
}

/// In-memory transport returning scripted outcomes.
///
/// Clones share the same script and call log. A request whose URL has no
/// outcome left fails with [`TransportError::Failed`].
///
/// # Example
///
/// ```
/// use relaykit_core::{Transport, TransportRequest, TransportError};
/// use relaykit_testing::ScriptedTransport;
/// use std::time::Duration;
///
/// let transport = ScriptedTransport::new();
/// transport.push_timeout("/slow");
/// transport.push_response("/slow", 200, r#"{"ok":true}"#);
///
/// let request = TransportRequest {
///     method: "GET".into(),
///     url: "/slow".into(),
///     headers: Default::default(),
///     json_body: None,
///     timeout: Duration::from_secs(1),
/// };
///
/// assert_eq!(transport.blocking_request(&request), Err(TransportError::Timeout));
/// assert_eq!(transport.blocking_request(&request).map(|r| r.status), Ok(200));
/// assert_eq!(transport.call_count(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<HashMap<String, VecDeque<TransportResult>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedTransport {
    /// Create a transport with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary outcome for `url`
    pub fn push_outcome(&self, url: impl Into<String>, outcome: TransportResult) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(outcome);
    }

    /// Queue a response for `url`
    pub fn push_response(&self, url: impl Into<String>, status: u16, body: impl Into<ResponseBody>) {
        self.push_outcome(url, Ok(TransportResponse::new(status, body)));
    }

    /// Queue a timeout for `url`
    pub fn push_timeout(&self, url: impl Into<String>) {
        self.push_outcome(url, Err(TransportError::Timeout));
    }

    /// Queue a non-timeout failure for `url`
    pub fn push_failure(&self, url: impl Into<String>, message: impl Into<String>) {
        self.push_outcome(url, Err(TransportError::Failed(message.into())));
    }

    /// Every invocation so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Outcomes still queued for `url`
    #[must_use]
    pub fn remaining(&self, url: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .get(url)
            .map_or(0, VecDeque::len)
    }

    /// Drop the script and the call log (for test isolation)
    pub fn clear(&self) {
        self.scripts.lock().unwrap().clear();
        self.calls.lock().unwrap().clear();
    }

    fn next(&self, mode: CallMode, request: &TransportRequest) -> TransportResult {
        self.calls.lock().unwrap().push(RecordedCall {
            mode,
            request: request.clone(),
        });

        self.scripts
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(TransportError::Failed(format!(
                    "no scripted outcome for {}",
                    request.url
                )))
            })
    }
}

impl Transport for ScriptedTransport {
    fn blocking_request(&self, request: &TransportRequest) -> TransportResult {
        self.next(CallMode::Blocking, request)
    }

    async fn suspending_request(&self, request: &TransportRequest) -> TransportResult {
        let outcome = self.next(CallMode::Suspending, request);
        // Give up the executor once, as a real network call would
        tokio::task::yield_now().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(url: &str) -> TransportRequest {
        TransportRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: Default::default(),
            json_body: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_outcomes_are_fifo_per_url() {
        let transport = ScriptedTransport::new();
        transport.push_response("/a", 500, "");
        transport.push_response("/b", 201, "");
        transport.push_response("/a", 200, "");

        assert_eq!(transport.blocking_request(&request("/a")).unwrap().status, 500);
        assert_eq!(transport.blocking_request(&request("/b")).unwrap().status, 201);
        assert_eq!(transport.blocking_request(&request("/a")).unwrap().status, 200);
        assert_eq!(transport.remaining("/a"), 0);
    }

    #[test]
    fn test_unscripted_url_fails() {
        let transport = ScriptedTransport::new();
        let outcome = transport.blocking_request(&request("/none"));
        assert!(matches!(outcome, Err(TransportError::Failed(_))));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_modes_share_the_script() {
        let transport = ScriptedTransport::new();
        transport.push_timeout("/a");
        transport.push_failure("/a", "refused");

        assert_eq!(
            transport.suspending_request(&request("/a")).await,
            Err(TransportError::Timeout)
        );
        assert_eq!(
            transport.blocking_request(&request("/a")),
            Err(TransportError::Failed("refused".to_string()))
        );

        let modes: Vec<CallMode> = transport.calls().iter().map(|c| c.mode).collect();
        assert_eq!(modes, vec![CallMode::Suspending, CallMode::Blocking]);
    }

    #[test]
    fn test_clones_share_state() {
        let transport = ScriptedTransport::new();
        let handle = transport.clone();
        handle.push_response("/a", 200, "{}");

        let _ = transport.blocking_request(&request("/a"));
        assert_eq!(handle.call_count(), 1);

        handle.clear();
        assert_eq!(transport.call_count(), 0);
    }
}
