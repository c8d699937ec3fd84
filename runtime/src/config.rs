//! Orchestrator configuration.
//!
//! Configuration is read from the environment:
//!
//! | variable | format | meaning |
//! |---|---|---|
//! | `RELAYKIT_DEFAULT_HEADERS` | JSON object of strings | engine-wide default headers |
//! | `RELAYKIT_ENDPOINTS_FILE` | path | JSON array of endpoint specs |
//!
//! Both are optional. Without an endpoints file the registry is empty.
//!
//! # Example
//!
//! ```
//! use relaykit_runtime::config::OrchestratorConfig;
//!
//! let config = OrchestratorConfig::new().with_default_header("User-Agent", "relaykit");
//! let snapshot = config.snapshot()?;
//!
//! assert_eq!(snapshot.default_headers()["User-Agent"], "relaykit");
//! assert!(snapshot.registry().is_empty());
//! # Ok::<(), relaykit_runtime::config::ConfigError>(())
//! ```

use crate::snapshot::EngineSnapshot;
use relaykit_core::{EndpointRegistry, HeaderMap, RegistryError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the default headers.
pub const DEFAULT_HEADERS_VAR: &str = "RELAYKIT_DEFAULT_HEADERS";

/// Environment variable holding the endpoints file path.
pub const ENDPOINTS_FILE_VAR: &str = "RELAYKIT_ENDPOINTS_FILE";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {var}: {reason}")]
    InvalidVar {
        /// Variable name
        var: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The endpoints file could not be read.
    #[error("Failed to read endpoints file {path}: {source}")]
    ReadEndpoints {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The endpoints file does not describe a valid registry.
    #[error("Invalid endpoints file: {0}")]
    Registry(#[from] RegistryError),
}

/// Settings used to build an [`EngineSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    default_headers: HeaderMap,
    endpoints_file: Option<PathBuf>,
}

impl OrchestratorConfig {
    /// Empty configuration: no default headers, no endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVar`] if `RELAYKIT_DEFAULT_HEADERS` is
    /// not a JSON object of strings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default_headers = match lookup(DEFAULT_HEADERS_VAR) {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidVar {
                    var: DEFAULT_HEADERS_VAR,
                    reason: e.to_string(),
                })?
            }
            _ => HeaderMap::new(),
        };

        let endpoints_file = lookup(ENDPOINTS_FILE_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            default_headers,
            endpoints_file,
        })
    }

    /// Add a default header.
    #[must_use]
    pub fn with_default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the endpoints file.
    #[must_use]
    pub fn with_endpoints_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.endpoints_file = Some(path.into());
        self
    }

    /// Engine-wide default headers.
    #[must_use]
    pub const fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Configured endpoints file, if any.
    #[must_use]
    pub fn endpoints_file(&self) -> Option<&Path> {
        self.endpoints_file.as_deref()
    }

    /// Read the endpoints file into a registry.
    ///
    /// Without an endpoints file the registry is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadEndpoints`] if the file cannot be read and
    /// [`ConfigError::Registry`] if its content is invalid.
    pub fn load_registry(&self) -> Result<EndpointRegistry, ConfigError> {
        let Some(path) = &self.endpoints_file else {
            return Ok(EndpointRegistry::default());
        };

        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadEndpoints {
            path: path.clone(),
            source,
        })?;
        let registry = EndpointRegistry::from_json(&json)?;

        tracing::info!(path = %path.display(), endpoints = registry.len(), "Loaded endpoints");
        Ok(registry)
    }

    /// Build the engine snapshot described by this configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load_registry`].
    pub fn snapshot(&self) -> Result<EngineSnapshot, ConfigError> {
        Ok(EngineSnapshot::new(
            self.load_registry()?,
            self.default_headers.clone(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    fn temp_file(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("relaykit-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_environment() {
        let config = OrchestratorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OrchestratorConfig::new());
        assert!(config.load_registry().unwrap().is_empty());
    }

    #[test]
    fn test_default_headers_from_env() {
        let config = OrchestratorConfig::from_lookup(lookup(&[(
            DEFAULT_HEADERS_VAR,
            r#"{"X-Default": "1", "Accept": "application/json"}"#,
        )]))
        .unwrap();
        assert_eq!(config.default_headers().len(), 2);
        assert_eq!(config.default_headers()["X-Default"], "1");
    }

    #[test]
    fn test_invalid_default_headers() {
        let result =
            OrchestratorConfig::from_lookup(lookup(&[(DEFAULT_HEADERS_VAR, r#"{"X-N": 1}"#)]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidVar { var: DEFAULT_HEADERS_VAR, .. })
        ));
    }

    #[test]
    fn test_load_registry_from_file() {
        let path = temp_file(r#"[{"name": "ok", "method": "GET", "url": "/ok"}]"#);
        let config = OrchestratorConfig::from_lookup(lookup(&[(
            ENDPOINTS_FILE_VAR,
            path.to_str().unwrap(),
        )]))
        .unwrap();

        let snapshot = config.snapshot().unwrap();
        assert!(snapshot.registry().contains("ok"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_endpoints_file() {
        let config = OrchestratorConfig::new().with_endpoints_file("/nonexistent/relaykit.json");
        assert!(matches!(
            config.load_registry(),
            Err(ConfigError::ReadEndpoints { .. })
        ));
    }

    #[test]
    fn test_invalid_endpoints_file() {
        let path = temp_file("[{}]");
        let config = OrchestratorConfig::new().with_endpoints_file(&path);
        assert!(matches!(config.load_registry(), Err(ConfigError::Registry(_))));
        std::fs::remove_file(path).unwrap();
    }
}
