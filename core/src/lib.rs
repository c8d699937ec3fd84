//! # relaykit Core
//!
//! Data model and collaborator contracts for the relaykit request
//! orchestration engine.
//!
//! This crate contains everything the orchestrator composes but none of its
//! control flow:
//!
//! - **[`endpoint`]**: named remote operation definitions
//! - **[`registry`]**: read-only lookup of endpoints by name
//! - **[`headers`]**: precedence merge of default, endpoint and call headers
//! - **[`codec`]**: JSON decoding of payloads and response normalization
//! - **[`trace`]**: trace events and sinks
//! - **[`transport`]**: the pluggable transport contract
//! - **[`call`]**: call context, result and error codes
//! - **[`environment`]**: injected dependencies (clock)
//!
//! The pipeline itself lives in `relaykit-runtime`.
//!
//! ## Example
//!
//! ```
//! use relaykit_core::{EndpointRegistry, EndpointSpec, headers};
//!
//! let spec = EndpointSpec::builder("ok", "GET", "https://example.com/ok")
//!     .static_header("X-E", "e")
//!     .build()?;
//! let registry = EndpointRegistry::new([spec])?;
//!
//! let endpoint = registry.get("ok").ok_or("missing")?;
//! let merged = headers::merge(
//!     &Default::default(),
//!     endpoint.static_headers(),
//!     &Default::default(),
//! );
//! assert_eq!(merged["X-E"], "e");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod call;
pub mod codec;
pub mod endpoint;
pub mod headers;
pub mod registry;
pub mod trace;
pub mod transport;

// Re-export commonly used types
pub use call::{CallContext, CallError, CallResult};
pub use codec::{CodecError, PayloadCodec};
pub use endpoint::{EndpointError, EndpointSpec};
pub use headers::HeaderMap;
pub use registry::{EndpointRegistry, RegistryError};
pub use trace::{InMemoryTraceSink, LoggingTraceSink, TraceEvent, TracePayload, TraceSink};
pub use transport::{
    ResponseBody, Transport, TransportError, TransportRequest, TransportResponse, TransportResult,
};

/// Environment module - injected dependencies
///
/// Anything non-deterministic that the engine touches is abstracted here so
/// tests can substitute a fixed implementation.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{DateTime, Utc};
    /// use relaykit_core::environment::Clock;
    ///
    /// // Test - fixed time for deterministic traces
    /// struct FixedClock {
    ///     time: DateTime<Utc>,
    /// }
    ///
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
