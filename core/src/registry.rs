//! Read-only endpoint lookup.
//!
//! The registry is built once and never mutated. To change the set of
//! endpoints at runtime, build a new registry and swap it into the
//! orchestrator as part of a new engine snapshot.

use crate::endpoint::{EndpointError, EndpointSpec};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two specs share a name.
    #[error("Duplicate endpoint name: {0}")]
    DuplicateEndpoint(String),

    /// The JSON document could not be parsed as a list of endpoint specs.
    #[error("Invalid endpoint document: {0}")]
    InvalidJson(String),

    /// A spec failed validation.
    #[error(transparent)]
    InvalidEndpoint(#[from] EndpointError),
}

/// Endpoint definitions keyed by name.
///
/// # Example
///
/// ```
/// use relaykit_core::registry::EndpointRegistry;
///
/// let registry = EndpointRegistry::from_json(
///     r#"[{"name": "ok", "method": "GET", "url": "https://example.com/ok"}]"#,
/// )?;
///
/// assert!(registry.get("ok").is_some());
/// assert!(registry.get("missing").is_none());
/// # Ok::<(), relaykit_core::registry::RegistryError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Arc<EndpointSpec>>,
}

impl EndpointRegistry {
    /// Build a registry from specs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateEndpoint`] if two specs share a name.
    pub fn new(specs: impl IntoIterator<Item = EndpointSpec>) -> Result<Self, RegistryError> {
        let mut endpoints = HashMap::new();
        for spec in specs {
            match endpoints.entry(spec.name().to_string()) {
                Entry::Occupied(entry) => {
                    return Err(RegistryError::DuplicateEndpoint(entry.key().clone()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(spec));
                }
            }
        }
        Ok(Self { endpoints })
    }

    /// Build a registry from a JSON array of endpoint specs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidJson`] if the document does not parse,
    /// [`RegistryError::InvalidEndpoint`] if a spec is invalid, and
    /// [`RegistryError::DuplicateEndpoint`] on a repeated name.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let specs: Vec<EndpointSpec> =
            serde_json::from_str(json).map_err(|e| RegistryError::InvalidJson(e.to_string()))?;
        for spec in &specs {
            spec.validate()?;
        }
        Self::new(specs)
    }

    /// Look up an endpoint by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<EndpointSpec>> {
        self.endpoints.get(name).cloned()
    }

    /// Whether an endpoint with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
