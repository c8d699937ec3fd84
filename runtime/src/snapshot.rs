//! Immutable engine configuration.

use relaykit_core::{EndpointRegistry, HeaderMap};

/// The registry and default headers a call reads for its whole duration.
///
/// Snapshots are never mutated. The orchestrator swaps in a new one to
/// reconfigure, and calls already in flight keep the one they loaded.
#[derive(Debug, Clone, Default)]
pub struct EngineSnapshot {
    registry: EndpointRegistry,
    default_headers: HeaderMap,
}

impl EngineSnapshot {
    /// Create a snapshot.
    #[must_use]
    pub const fn new(registry: EndpointRegistry, default_headers: HeaderMap) -> Self {
        Self {
            registry,
            default_headers,
        }
    }

    /// Endpoint definitions.
    #[must_use]
    pub const fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Engine-wide default headers, lowest precedence when merging.
    #[must_use]
    pub const fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }
}
