//! call-endpoint - execute one relaykit call against a real HTTP endpoint
//!
//! # Usage
//!
//! ```bash
//! export RELAYKIT_ENDPOINTS_FILE=endpoints.json
//! export RELAYKIT_DEFAULT_HEADERS='{"User-Agent":"relaykit-demo"}'
//! cargo run -p call-endpoint -- users.get
//! cargo run -p call-endpoint -- users.create '{"name":"ada"}' --blocking --metrics
//! ```
//!
//! `endpoints.json` holds an array of endpoint definitions:
//!
//! ```json
//! [
//!   {"name": "users.get", "method": "GET", "url": "https://example.com/users",
//!    "timeout_secs": 2.5, "max_retries": 2, "retryable_statuses": [502, 503]}
//! ]
//! ```
//!
//! Prints the call result and its trace as JSON on stdout. Logs go to stderr
//! and are filtered with `RUST_LOG`.

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use relaykit_core::{CallContext, CallResult, InMemoryTraceSink};
use relaykit_http::ReqwestTransport;
use relaykit_runtime::metrics::MetricsServer;
use relaykit_runtime::{OrchestratorConfig, RequestOrchestrator};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "call-endpoint")]
#[command(about = "Execute one relaykit call and print the result and trace", long_about = None)]
struct Args {
    /// Registered endpoint name
    endpoint: String,

    /// JSON payload sent as the request body
    payload: Option<String>,

    /// Use the blocking entry point
    #[arg(long)]
    blocking: bool,

    /// Install the Prometheus recorder and print the exposition text
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaykit_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut metrics_server = None;
    if args.metrics {
        let mut server = MetricsServer::new(([127, 0, 0, 1], 9000).into());
        server.start().context("failed to install metrics recorder")?;
        metrics_server = Some(server);
    }

    let config = OrchestratorConfig::from_env().context("invalid relaykit environment")?;
    let snapshot = config.snapshot().context("failed to load endpoints")?;
    tracing::info!(
        endpoints = snapshot.registry().len(),
        blocking = args.blocking,
        "Orchestrator configured"
    );

    let sink = InMemoryTraceSink::new();
    let orchestrator = Arc::new(RequestOrchestrator::new(
        snapshot,
        ReqwestTransport::new(),
        Arc::new(sink.clone()),
    ));

    let result = execute(orchestrator, args.endpoint, args.payload, args.blocking).await?;

    let report = serde_json::json!({
        "result": result,
        "trace": sink.events(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(text) = metrics_server.as_ref().and_then(MetricsServer::render) {
        eprintln!("{text}");
    }

    Ok(())
}

async fn execute(
    orchestrator: Arc<RequestOrchestrator<ReqwestTransport>>,
    endpoint: String,
    payload: Option<String>,
    blocking: bool,
) -> anyhow::Result<CallResult> {
    let ctx = CallContext::new();

    if blocking {
        // The blocking client runs its own runtime and must stay off the async workers
        tokio::task::spawn_blocking(move || {
            orchestrator.execute_blocking(&ctx, &endpoint, payload.as_deref())
        })
        .await
        .context("blocking call panicked")
    } else {
        Ok(orchestrator
            .execute_non_blocking(&ctx, &endpoint, payload.as_deref())
            .await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_only() {
        let args = Args::try_parse_from(["call-endpoint", "users.get"]).unwrap();
        assert_eq!(args.endpoint, "users.get");
        assert_eq!(args.payload, None);
        assert!(!args.blocking);
        assert!(!args.metrics);
    }

    #[test]
    fn test_parse_payload_and_flags() {
        let args = Args::try_parse_from([
            "call-endpoint",
            "--blocking",
            "users.create",
            r#"{"a":1}"#,
            "--metrics",
        ])
        .unwrap();
        assert_eq!(args.endpoint, "users.create");
        assert_eq!(args.payload.as_deref(), Some(r#"{"a":1}"#));
        assert!(args.blocking);
        assert!(args.metrics);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Args::try_parse_from(["call-endpoint"]).is_err());
        assert!(Args::try_parse_from(["call-endpoint", "a", "{}", "extra"]).is_err());
        assert!(Args::try_parse_from(["call-endpoint", "a", "--verbose"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
