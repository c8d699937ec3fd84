//! Endpoint definitions.
//!
//! An [`EndpointSpec`] describes one named remote operation: how to reach it
//! (method, URL), how long a single attempt may take, and which responses are
//! worth retrying. Specs are immutable once built; the registry owns them and
//! hands out shared references.
//!
//! # Example
//!
//! ```
//! use relaykit_core::endpoint::EndpointSpec;
//! use std::time::Duration;
//!
//! let spec = EndpointSpec::builder("users.get", "GET", "https://api.example.com/users")
//!     .timeout(Duration::from_secs(2))
//!     .max_retries(2)
//!     .retryable_statuses([502, 503])
//!     .static_header("Accept", "application/json")
//!     .build()?;
//!
//! assert_eq!(spec.max_retries(), 2);
//! assert!(spec.is_retryable_status(503));
//! # Ok::<(), relaykit_core::endpoint::EndpointError>(())
//! ```

use crate::headers::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Timeout applied when an endpoint does not configure one (5 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Statuses retried when an endpoint does not configure its own set.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 3] = [500, 502, 503];

/// Errors raised while constructing an [`EndpointSpec`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The endpoint name is empty.
    #[error("Endpoint name must not be empty")]
    EmptyName,

    /// The HTTP method is empty.
    #[error("Endpoint {0} has an empty method")]
    EmptyMethod(String),

    /// The timeout is negative, NaN or infinite.
    #[error("Endpoint {name} has an invalid timeout: {reason}")]
    InvalidTimeout {
        /// Endpoint name
        name: String,
        /// Why the timeout was rejected
        reason: String,
    },
}

/// A named remote operation definition.
///
/// Deserializes from JSON such as:
///
/// ```json
/// {
///   "name": "orders.create",
///   "method": "POST",
///   "url": "https://api.example.com/orders",
///   "timeout_secs": 2.5,
///   "max_retries": 1,
///   "retryable_statuses": [503],
///   "static_headers": {"Accept": "application/json"}
/// }
/// ```
///
/// Only `name`, `method` and `url` are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    name: String,
    method: String,
    url: String,
    #[serde(
        rename = "timeout_secs",
        default = "default_timeout",
        serialize_with = "serialize_timeout",
        deserialize_with = "deserialize_timeout"
    )]
    timeout: Duration,
    #[serde(default)]
    max_retries: u32,
    #[serde(default = "default_retryable_statuses")]
    retryable_statuses: BTreeSet<u16>,
    #[serde(default)]
    static_headers: HeaderMap,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retryable_statuses() -> BTreeSet<u16> {
    DEFAULT_RETRYABLE_STATUSES.into_iter().collect()
}

fn serialize_timeout<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(timeout.as_secs_f64())
}

fn deserialize_timeout<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

impl EndpointSpec {
    /// Start building a spec with the three required fields.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> EndpointSpecBuilder {
        EndpointSpecBuilder {
            name: name.into(),
            method: method.into(),
            url: url.into(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
            max_retries: 0,
            retryable_statuses: default_retryable_statuses(),
            static_headers: HeaderMap::new(),
        }
    }

    /// Endpoint name (registry key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTP method, passed to the transport verbatim.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-attempt timeout handed to the transport.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of additional dispatches allowed after the first.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Statuses eligible for automatic retry.
    #[must_use]
    pub const fn retryable_statuses(&self) -> &BTreeSet<u16> {
        &self.retryable_statuses
    }

    /// Whether `status` is configured as retryable for this endpoint.
    #[must_use]
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Headers sent on every call to this endpoint.
    #[must_use]
    pub const fn static_headers(&self) -> &HeaderMap {
        &self.static_headers
    }

    pub(crate) fn validate(&self) -> Result<(), EndpointError> {
        if self.name.is_empty() {
            return Err(EndpointError::EmptyName);
        }
        if self.method.is_empty() {
            return Err(EndpointError::EmptyMethod(self.name.clone()));
        }
        Ok(())
    }
}

/// Builder for [`EndpointSpec`].
#[derive(Debug, Clone)]
pub struct EndpointSpecBuilder {
    name: String,
    method: String,
    url: String,
    timeout_secs: f64,
    max_retries: u32,
    retryable_statuses: BTreeSet<u16>,
    static_headers: HeaderMap,
}

impl EndpointSpecBuilder {
    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set the per-attempt timeout in (fractional) seconds.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replace the retryable status set.
    #[must_use]
    pub fn retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Add one static header. A later call with the same key wins.
    #[must_use]
    pub fn static_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_headers.insert(key.into(), value.into());
        self
    }

    /// Validate and build the spec.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] if the name or method is empty or the
    /// timeout is not a finite, non-negative number of seconds.
    pub fn build(self) -> Result<EndpointSpec, EndpointError> {
        let timeout = Duration::try_from_secs_f64(self.timeout_secs).map_err(|e| {
            EndpointError::InvalidTimeout {
                name: self.name.clone(),
                reason: e.to_string(),
            }
        })?;

        let spec = EndpointSpec {
            name: self.name,
            method: self.method,
            url: self.url,
            timeout,
            max_retries: self.max_retries,
            retryable_statuses: self.retryable_statuses,
            static_headers: self.static_headers,
        };
        spec.validate()?;
        Ok(spec)
    }
}
