//! HTTP transport for relaykit
//!
//! Implements [`relaykit_core::Transport`] with reqwest, so the orchestrator
//! can dispatch to real HTTP endpoints.
//!
//! # Example
//!
//! ```no_run
//! use relaykit_core::{CallContext, InMemoryTraceSink};
//! use relaykit_http::ReqwestTransport;
//! use relaykit_runtime::{RequestOrchestrator, config::OrchestratorConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshot = OrchestratorConfig::from_env()?.snapshot()?;
//! let orchestrator = RequestOrchestrator::new(
//!     snapshot,
//!     ReqwestTransport::new(),
//!     Arc::new(InMemoryTraceSink::new()),
//! );
//!
//! let result = orchestrator
//!     .execute_non_blocking(&CallContext::new(), "users.get", None)
//!     .await;
//! println!("{result:?}");
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::ReqwestTransport;
