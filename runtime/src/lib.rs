//! # relaykit Runtime
//!
//! The request orchestrator: resolves a named endpoint, decodes the payload,
//! merges headers, dispatches through a [`Transport`](relaykit_core::Transport)
//! with retries, normalizes the response and classifies the outcome.
//!
//! ## Core Components
//!
//! - **[`RequestOrchestrator`]**: the two entry points (blocking and
//!   non-blocking) and atomic reconfiguration
//! - **[`machine::CallMachine`]**: the sans-I/O state machine both entry
//!   points drive
//! - **[`EngineSnapshot`]**: the immutable registry and default headers a
//!   call reads
//! - **[`config::OrchestratorConfig`]**: environment-driven configuration
//! - **[`metrics`]**: Prometheus metrics
//!
//! ## Example
//!
//! ```no_run
//! use relaykit_core::{CallContext, InMemoryTraceSink, Transport};
//! use relaykit_runtime::{RequestOrchestrator, config::OrchestratorConfig};
//! use std::sync::Arc;
//!
//! # async fn example(transport: impl Transport) -> Result<(), Box<dyn std::error::Error>> {
//! let snapshot = OrchestratorConfig::from_env()?.snapshot()?;
//! let orchestrator = RequestOrchestrator::new(snapshot, transport, Arc::new(InMemoryTraceSink::new()));
//!
//! let ctx = CallContext::new().with_header("X-Request-Id", "42");
//! let result = orchestrator.execute_non_blocking(&ctx, "orders.create", Some(r#"{"sku":"a"}"#)).await;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok(())
//! # }
//! ```

/// Environment-driven configuration
pub mod config;

/// The sans-I/O call state machine
pub mod machine;

/// Prometheus metrics for observability
pub mod metrics;

mod orchestrator;
mod snapshot;

pub use config::{ConfigError, OrchestratorConfig};
pub use orchestrator::RequestOrchestrator;
pub use snapshot::EngineSnapshot;
