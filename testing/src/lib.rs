//! # relaykit Testing
//!
//! Testing utilities and helpers for relaykit.
//!
//! This crate provides:
//! - [`ScriptedTransport`]: a transport that replays queued outcomes
//! - [`FixedClock`]: deterministic trace timestamps
//! - Fixtures for endpoints and registries
//! - Assertion helpers for trace sequences
//!
//! ## Example
//!
//! ```
//! use relaykit_core::{CallContext, InMemoryTraceSink};
//! use relaykit_runtime::{EngineSnapshot, RequestOrchestrator};
//! use relaykit_testing::{ScriptedTransport, assert_event_types, fixtures};
//! use std::sync::Arc;
//!
//! let transport = ScriptedTransport::new();
//! transport.push_response("/ok", 200, r#"{"a":1}"#);
//!
//! let sink = InMemoryTraceSink::new();
//! let snapshot = EngineSnapshot::new(fixtures::standard_registry(), fixtures::default_headers());
//! let orchestrator = RequestOrchestrator::new(snapshot, transport.clone(), Arc::new(sink.clone()));
//!
//! let result = orchestrator.execute_blocking(&CallContext::new(), "ok", None);
//! assert!(result.ok);
//! assert_event_types(
//!     &sink,
//!     &["resolve.start", "resolve.done", "request.build", "request.start", "request.end", "response.ok"],
//! );
//! ```

use chrono::{DateTime, Utc};
use relaykit_core::environment::Clock;

mod scripted_transport;

pub use scripted_transport::{CallMode, RecordedCall, ScriptedTransport};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making trace timestamps reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use relaykit_testing::mocks::FixedClock;
    /// use relaykit_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Endpoint and registry fixtures
///
/// The standard registry mirrors the two endpoints most tests need:
///
/// | name | url | `max_retries` | retryable |
/// |---|---|---|---|
/// | `ok` | `/ok` | 0 | 500, 502, 503 |
/// | `retry` | `/retry` | 2 | 500 |
#[allow(clippy::expect_used)]
pub mod fixtures {
    use relaykit_core::{EndpointRegistry, EndpointSpec, HeaderMap};

    /// A `GET` endpoint with default policy
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn endpoint(name: &str, url: &str) -> EndpointSpec {
        EndpointSpec::builder(name, "GET", url)
            .build()
            .expect("fixture endpoint should be valid")
    }

    /// A `GET` endpoint retrying `statuses` up to `max_retries` times
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn retrying_endpoint(
        name: &str,
        url: &str,
        max_retries: u32,
        statuses: &[u16],
    ) -> EndpointSpec {
        EndpointSpec::builder(name, "GET", url)
            .max_retries(max_retries)
            .retryable_statuses(statuses.iter().copied())
            .build()
            .expect("fixture endpoint should be valid")
    }

    /// Registry with the `ok` and `retry` endpoints
    ///
    /// # Panics
    ///
    /// Never in practice; the fixture names are distinct.
    #[must_use]
    pub fn standard_registry() -> EndpointRegistry {
        EndpointRegistry::new([
            endpoint("ok", "/ok"),
            retrying_endpoint("retry", "/retry", 2, &[500]),
        ])
        .expect("fixture names should be unique")
    }

    /// Default headers used with the standard registry: `X-Default: 1`
    #[must_use]
    pub fn default_headers() -> HeaderMap {
        HeaderMap::from([("X-Default".to_string(), "1".to_string())])
    }
}

/// Assertion helpers for trace sequences
pub mod assertions {
    use relaykit_core::InMemoryTraceSink;

    /// Assert the sink holds exactly these event types, in order
    ///
    /// # Panics
    ///
    /// Panics with both sequences if they differ.
    #[track_caller]
    pub fn assert_event_types(sink: &InMemoryTraceSink, expected: &[&str]) {
        let actual = sink.event_types();
        assert_eq!(actual, expected, "unexpected trace event sequence");
    }
}

// Re-export commonly used items
pub use assertions::assert_event_types;
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use relaykit_core::{InMemoryTraceSink, TracePayload, TraceSink};
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_standard_registry() {
        let registry = fixtures::standard_registry();
        assert_eq!(registry.names(), vec!["ok", "retry"]);

        let retry = registry.get("retry").expect("retry endpoint should exist");
        assert_eq!(retry.max_retries(), 2);
        assert!(retry.is_retryable_status(500));
        assert!(!retry.is_retryable_status(503));
    }

    #[test]
    fn test_assert_event_types() {
        let sink = InMemoryTraceSink::with_clock(Arc::new(test_clock()));
        sink.emit(Uuid::new_v4(), "resolve.start", &TracePayload::new());
        assert_event_types(&sink, &["resolve.start"]);
    }

    #[test]
    #[should_panic(expected = "unexpected trace event sequence")]
    fn test_assert_event_types_mismatch() {
        let sink = InMemoryTraceSink::new();
        assert_event_types(&sink, &["resolve.start"]);
    }
}
