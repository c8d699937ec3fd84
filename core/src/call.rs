//! Call inputs and outcomes.
//!
//! [`CallContext`] carries the caller's per-call header overrides.
//! [`CallResult`] is the four-field outcome every call returns, whichever
//! path terminated it. Failures are described by [`CallError`], whose
//! `Display` output is the stable wire code (`timeout`, `upstream_error:503`,
//! ...).

use crate::headers::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Per-call options supplied by the caller.
///
/// The engine only reads the context; the caller keeps ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    #[serde(default)]
    headers: HeaderMap,
    #[serde(default)]
    call_id: Option<Uuid>,
}

impl CallContext {
    /// Context with no header overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose overrides are `headers`.
    #[must_use]
    pub const fn from_headers(headers: HeaderMap) -> Self {
        Self {
            headers,
            call_id: None,
        }
    }

    /// Add one header override.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Use `call_id` to tag this call's trace events instead of a fresh id.
    ///
    /// Lets callers correlate trace events with their own request ids.
    #[must_use]
    pub const fn with_call_id(mut self, call_id: Uuid) -> Self {
        self.call_id = Some(call_id);
        self
    }

    /// The header overrides, applied last when merging.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Caller-chosen call id, if any.
    #[must_use]
    pub const fn call_id(&self) -> Option<Uuid> {
        self.call_id
    }
}

/// Terminal failure classification of a call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallError {
    /// No endpoint with the requested name is registered.
    #[error("unknown_endpoint")]
    UnknownEndpoint,

    /// The request payload was not valid JSON.
    #[error("bad_payload")]
    BadPayload,

    /// Every permitted attempt timed out.
    #[error("timeout")]
    Timeout,

    /// The transport failed for a reason other than a timeout.
    #[error("network_error")]
    NetworkError,

    /// The response body could not be decoded.
    #[error("bad_response_json")]
    BadResponseJson,

    /// The final response had a non-2xx status.
    #[error("upstream_error:{0}")]
    UpstreamError(u16),
}

impl CallError {
    /// Low-cardinality label for metrics (the status is dropped).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownEndpoint => "unknown_endpoint",
            Self::BadPayload => "bad_payload",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::BadResponseJson => "bad_response_json",
            Self::UpstreamError(_) => "upstream_error",
        }
    }
}

/// Error returned when parsing an unrecognized error code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognized call error code: {0}")]
pub struct ParseCallErrorError(String);

impl FromStr for CallError {
    type Err = ParseCallErrorError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "unknown_endpoint" => Ok(Self::UnknownEndpoint),
            "bad_payload" => Ok(Self::BadPayload),
            "timeout" => Ok(Self::Timeout),
            "network_error" => Ok(Self::NetworkError),
            "bad_response_json" => Ok(Self::BadResponseJson),
            other => other
                .strip_prefix("upstream_error:")
                .and_then(|status| status.parse().ok())
                .map(Self::UpstreamError)
                .ok_or_else(|| ParseCallErrorError(other.to_string())),
        }
    }
}

impl Serialize for CallError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CallError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// Outcome of one call.
///
/// All four fields are always present in the serialized form:
///
/// ```json
/// {"ok": false, "status": 503, "data": null, "error": "upstream_error:503"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    /// Whether the call succeeded
    pub ok: bool,
    /// Status of the final response, if one was received
    pub status: Option<u16>,
    /// Normalized response body; JSON `null` is reported as absent
    pub data: Option<Value>,
    /// Failure classification, `None` when `ok`
    pub error: Option<CallError>,
}

impl CallResult {
    /// Successful outcome.
    #[must_use]
    pub fn success(status: u16, data: Value) -> Self {
        Self {
            ok: true,
            status: Some(status),
            data: present(data),
            error: None,
        }
    }

    /// Failure before any response was received.
    #[must_use]
    pub const fn failure(error: CallError) -> Self {
        Self {
            ok: false,
            status: None,
            data: None,
            error: Some(error),
        }
    }

    /// Failure after a response with `status` was received.
    #[must_use]
    pub fn response_failure(status: u16, data: Option<Value>, error: CallError) -> Self {
        Self {
            ok: false,
            status: Some(status),
            data: data.and_then(present),
            error: Some(error),
        }
    }

    /// Wire code of the error, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        self.error.map(|error| error.to_string())
    }
}

fn present(value: Value) -> Option<Value> {
    if value.is_null() { None } else { Some(value) }
}
