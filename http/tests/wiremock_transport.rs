//! End-to-end tests of `ReqwestTransport` against a local mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use relaykit_core::{
    CallContext, CallError, CallResult, EndpointRegistry, EndpointSpec, HeaderMap,
    InMemoryTraceSink, Transport, TransportError, TransportRequest,
};
use relaykit_http::ReqwestTransport;
use relaykit_runtime::{EngineSnapshot, RequestOrchestrator};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

fn orchestrator(
    specs: Vec<EndpointSpec>,
) -> (RequestOrchestrator<ReqwestTransport>, InMemoryTraceSink) {
    let sink = InMemoryTraceSink::new();
    let snapshot = EngineSnapshot::new(
        EndpointRegistry::new(specs).unwrap(),
        HeaderMap::from([("X-Default".to_string(), "1".to_string())]),
    );
    let orchestrator =
        RequestOrchestrator::new(snapshot, ReqwestTransport::new(), Arc::new(sink.clone()));
    (orchestrator, sink)
}

#[tokio::test]
async fn test_json_response_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"users":[1,2]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let spec = EndpointSpec::builder("users", "GET", format!("{}/users", server.uri()))
        .build()
        .unwrap();
    let (orchestrator, _sink) = orchestrator(vec![spec]);

    let result = orchestrator
        .execute_non_blocking(&CallContext::new(), "users", None)
        .await;
    assert_eq!(result, CallResult::success(200, json!({"users": [1, 2]})));
}

#[tokio::test]
async fn test_merged_headers_and_body_are_sent() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/orders"))
        .and(matchers::header("X-Default", "1"))
        .and(matchers::header("X-Endpoint", "E"))
        .and(matchers::header("X-Req", "R"))
        .and(matchers::header("content-type", "application/json"))
        .and(matchers::body_json(json!({"sku": "a", "qty": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":7}"#))
        .expect(1)
        .mount(&server)
        .await;

    let spec = EndpointSpec::builder("orders", "POST", format!("{}/orders", server.uri()))
        .static_header("X-Endpoint", "E")
        .build()
        .unwrap();
    let (orchestrator, _sink) = orchestrator(vec![spec]);

    let ctx = CallContext::new().with_header("X-Req", "R");
    let result = orchestrator
        .execute_non_blocking(&ctx, "orders", Some(r#"{"sku":"a","qty":2}"#))
        .await;
    assert_eq!(result, CallResult::success(201, json!({"id": 7})));
}

#[tokio::test]
async fn test_retryable_status_then_success() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let spec = EndpointSpec::builder("flaky", "GET", server.uri())
        .max_retries(1)
        .build()
        .unwrap();
    let (orchestrator, sink) = orchestrator(vec![spec]);

    let result = orchestrator
        .execute_non_blocking(&CallContext::new(), "flaky", None)
        .await;
    assert_eq!(result, CallResult::success(200, json!([])));
    assert!(sink.event_types().contains(&"request.retry".to_string()));
}

#[tokio::test]
async fn test_slow_upstream_times_out_and_retries() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let spec = EndpointSpec::builder("slow", "GET", server.uri())
        .timeout(Duration::from_millis(50))
        .max_retries(1)
        .build()
        .unwrap();
    let (orchestrator, _sink) = orchestrator(vec![spec]);

    let result = orchestrator
        .execute_non_blocking(&CallContext::new(), "slow", None)
        .await;
    assert_eq!(result, CallResult::failure(CallError::Timeout));
}

#[tokio::test]
async fn test_upstream_error_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"not found"}"#))
        .mount(&server)
        .await;

    let spec = EndpointSpec::builder("missing", "GET", server.uri()).build().unwrap();
    let (orchestrator, _sink) = orchestrator(vec![spec]);

    let result = orchestrator
        .execute_non_blocking(&CallContext::new(), "missing", None)
        .await;
    assert_eq!(
        result,
        CallResult::response_failure(404, Some(json!({"error": "not found"})), CallError::UpstreamError(404))
    );
}

#[tokio::test]
async fn test_html_body_is_bad_response_json() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let spec = EndpointSpec::builder("html", "GET", server.uri()).build().unwrap();
    let (orchestrator, _sink) = orchestrator(vec![spec]);

    let result = orchestrator
        .execute_non_blocking(&CallContext::new(), "html", None)
        .await;
    assert_eq!(
        result,
        CallResult::response_failure(200, None, CallError::BadResponseJson)
    );
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Nothing listens on port 1
    let spec = EndpointSpec::builder("down", "GET", "http://127.0.0.1:1/")
        .max_retries(3)
        .build()
        .unwrap();
    let (orchestrator, sink) = orchestrator(vec![spec]);

    let result = orchestrator
        .execute_non_blocking(&CallContext::new(), "down", None)
        .await;
    assert_eq!(result, CallResult::failure(CallError::NetworkError));
    assert_eq!(
        sink.event_types()
            .iter()
            .filter(|t| t.as_str() == "request.start")
            .count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_blocking_mode_matches_non_blocking() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::header("X-Default", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"v":1}"#))
        .expect(2)
        .mount(&server)
        .await;
    let uri = server.uri();

    let blocking = tokio::task::spawn_blocking(move || {
        // The blocking client owns a runtime and must live outside async context
        let spec = EndpointSpec::builder("v", "GET", uri).build().unwrap();
        let (orchestrator, sink) = orchestrator(vec![spec]);
        let result = orchestrator.execute_blocking(&CallContext::new(), "v", None);
        (result, sink.event_types())
    })
    .await
    .expect("blocking call should not panic");

    let spec = EndpointSpec::builder("v", "GET", server.uri()).build().unwrap();
    let (orchestrator, sink) = orchestrator(vec![spec]);
    let result = orchestrator
        .execute_non_blocking(&CallContext::new(), "v", None)
        .await;

    assert_eq!(blocking.0, result);
    assert_eq!(blocking.1, sink.event_types());
}

#[tokio::test]
async fn test_invalid_method_fails_fast() {
    let transport = ReqwestTransport::new();
    let request = TransportRequest {
        method: "NOT VALID".to_string(),
        url: "http://127.0.0.1:1/".to_string(),
        headers: HeaderMap::new(),
        json_body: None,
        timeout: Duration::from_secs(1),
    };

    let outcome = transport.suspending_request(&request).await;
    assert!(matches!(outcome, Err(TransportError::Failed(_))));
}
