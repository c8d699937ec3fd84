//! Transport contract.
//!
//! The transport is the external collaborator that performs the network call
//! on the engine's behalf. relaykit never does I/O itself: it builds a
//! [`TransportRequest`], hands it to a [`Transport`], and interprets the
//! outcome.
//!
//! # Contract
//!
//! Both operations take the same request and produce the same result type.
//! They differ only in how the caller waits:
//!
//! - [`Transport::blocking_request`] blocks the calling thread.
//! - [`Transport::suspending_request`] returns a future; the only suspension
//!   point of a non-blocking call is awaiting it.
//!
//! A transport must report an expired deadline as [`TransportError::Timeout`]
//! and every other failure as [`TransportError::Failed`]. The orchestrator
//! retries the former and never the latter, and it does not enforce
//! `timeout` itself.
//!
//! # Implementations
//!
//! - `ReqwestTransport` (in `relaykit-http`): HTTP via reqwest
//! - `ScriptedTransport` (in `relaykit-testing`): scripted outcomes for tests

use crate::headers::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Everything a transport needs to perform one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    /// HTTP method, as configured on the endpoint
    pub method: String,
    /// Target URL
    pub url: String,
    /// Merged headers
    pub headers: HeaderMap,
    /// Decoded request payload, `None` when the caller sent no payload or JSON `null`
    pub json_body: Option<Value>,
    /// Deadline for this attempt
    pub timeout: Duration,
}

/// Body of a transport response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// Raw text, decoded as JSON by the orchestrator when non-empty
    Text(String),
    /// Already-structured value, passed through unchanged
    Json(Value),
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// A response received from the remote side (any status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    /// Status code
    pub status: u16,
    /// Response body
    pub body: ResponseBody,
}

impl TransportResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<ResponseBody>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt exceeded its deadline. Retryable.
    #[error("Request timed out")]
    Timeout,

    /// Any other failure (connection refused, DNS, protocol error...). Never retried.
    #[error("Request failed: {0}")]
    Failed(String),
}

impl TransportError {
    /// Whether this failure is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Result of one transport attempt.
pub type TransportResult = Result<TransportResponse, TransportError>;

/// The pluggable transport.
///
/// Implementations must be `Send + Sync`: one orchestrator (and therefore one
/// transport) serves concurrent calls.
pub trait Transport: Send + Sync {
    /// Perform one attempt, blocking the calling thread until it completes.
    ///
    /// # Errors
    ///
    /// [`TransportError::Timeout`] if the deadline expired,
    /// [`TransportError::Failed`] for any other failure.
    fn blocking_request(&self, request: &TransportRequest) -> TransportResult;

    /// Perform one attempt without blocking; the returned future resolves
    /// with the same outcome the blocking variant would produce.
    ///
    /// # Errors
    ///
    /// Same contract as [`Transport::blocking_request`].
    fn suspending_request(
        &self,
        request: &TransportRequest,
    ) -> impl Future<Output = TransportResult> + Send;
}
