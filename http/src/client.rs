//! reqwest-backed transport

use relaykit_core::{
    PayloadCodec, ResponseBody, Transport, TransportError, TransportRequest, TransportResponse,
    TransportResult,
};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::sync::OnceLock;

/// HTTP transport over reqwest
///
/// The suspending operation uses an async [`reqwest::Client`]. The blocking
/// operation uses a [`reqwest::blocking::Client`] built on first use, since
/// it spins up its own runtime thread; it must not be called from inside an
/// async context.
///
/// Every request carries its own timeout. Expired deadlines are reported as
/// [`TransportError::Timeout`]; connection, DNS, TLS and protocol errors as
/// [`TransportError::Failed`]. An invalid method or header fails before any
/// network activity.
pub struct ReqwestTransport {
    client: reqwest::Client,
    blocking: OnceLock<Result<reqwest::blocking::Client, String>>,
}

impl ReqwestTransport {
    /// Create a transport with default clients
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a transport around an existing async client
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            blocking: OnceLock::new(),
        }
    }

    fn blocking_client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        self.blocking
            .get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .build()
                    .map_err(|e| format!("failed to build blocking client: {e}"))
            })
            .as_ref()
            .map_err(|message| TransportError::Failed(message.clone()))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("blocking_initialized", &self.blocking.get().is_some())
            .finish_non_exhaustive()
    }
}

/// Method, headers and encoded body, validated before any I/O
struct Prepared {
    method: Method,
    headers: HeaderMap,
    body: Option<String>,
}

fn prepare(request: &TransportRequest) -> Result<Prepared, TransportError> {
    let method = Method::from_bytes(request.method.as_bytes())
        .map_err(|e| TransportError::Failed(format!("invalid method {:?}: {e}", request.method)))?;

    let mut headers = HeaderMap::with_capacity(request.headers.len() + 1);
    for (key, value) in &request.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| TransportError::Failed(format!("invalid header name {key:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Failed(format!("invalid value for header {key}: {e}")))?;
        headers.append(name, value);
    }

    let body = request.json_body.as_ref().map(|value| {
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        PayloadCodec::encode(value)
    });

    Ok(Prepared {
        method,
        headers,
        body,
    })
}

fn map_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Failed(error.to_string())
    }
}

impl Transport for ReqwestTransport {
    fn blocking_request(&self, request: &TransportRequest) -> TransportResult {
        let prepared = prepare(request)?;
        let client = self.blocking_client()?;

        let mut builder = client
            .request(prepared.method, &request.url)
            .headers(prepared.headers)
            .timeout(request.timeout);
        if let Some(body) = prepared.body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(|e| map_error(&e))?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|e| map_error(&e))?;

        tracing::trace!(url = %request.url, status, "Blocking HTTP request completed");
        Ok(TransportResponse::new(status, ResponseBody::Text(text)))
    }

    async fn suspending_request(&self, request: &TransportRequest) -> TransportResult {
        let prepared = prepare(request)?;

        let mut builder = self
            .client
            .request(prepared.method, &request.url)
            .headers(prepared.headers)
            .timeout(request.timeout);
        if let Some(body) = prepared.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| map_error(&e))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| map_error(&e))?;

        tracing::trace!(url = %request.url, status, "HTTP request completed");
        Ok(TransportResponse::new(status, ResponseBody::Text(text)))
    }
}
