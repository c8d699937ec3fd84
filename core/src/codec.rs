//! JSON encoding and decoding for request and response bodies.
//!
//! Request payloads arrive from callers as raw text and are decoded before
//! dispatch. Response bodies are normalized: textual, non-empty bodies are
//! decoded, everything else (structured values, empty strings) passes
//! through untouched.

use crate::transport::ResponseBody;
use serde_json::Value;
use thiserror::Error;

/// Errors from the payload codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The text is not valid JSON.
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),
}

impl CodecError {
    /// Decoder message without the error-kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::MalformedJson(message) => message,
        }
    }
}

/// JSON codec used by the orchestrator and transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec;

impl PayloadCodec {
    /// Decode JSON text into a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedJson`] when `text` is not valid JSON.
    pub fn decode(text: &str) -> Result<Value, CodecError> {
        serde_json::from_str(text).map_err(|e| CodecError::MalformedJson(e.to_string()))
    }

    /// Encode a value as compact JSON text.
    #[must_use]
    pub fn encode(value: &Value) -> String {
        // Display on Value is infallible compact serialization
        value.to_string()
    }

    /// Normalize a response body into a JSON value.
    ///
    /// | body | result |
    /// |---|---|
    /// | `Text("")` | `Value::String("")`, unchanged |
    /// | `Text(non-empty)` | decoded JSON |
    /// | `Json(v)` | `v`, unchanged |
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedJson`] when a non-empty textual body is
    /// not valid JSON.
    pub fn normalize_body(body: ResponseBody) -> Result<Value, CodecError> {
        match body {
            ResponseBody::Text(text) if text.is_empty() => Ok(Value::String(text)),
            ResponseBody::Text(text) => Self::decode(&text),
            ResponseBody::Json(value) => Ok(value),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_valid() {
        assert_eq!(PayloadCodec::decode(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(PayloadCodec::decode("null").unwrap(), Value::Null);
        assert_eq!(PayloadCodec::decode("{}").unwrap(), json!({}));
    }

    #[test]
    fn test_decode_malformed() {
        let err = PayloadCodec::decode("{not-json}").unwrap_err();
        assert!(matches!(err, CodecError::MalformedJson(_)));
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_encode_compact() {
        assert_eq!(PayloadCodec::encode(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_normalize_text_is_decoded() {
        let value = PayloadCodec::normalize_body(ResponseBody::Text(r#"{"v":1}"#.into())).unwrap();
        assert_eq!(value, json!({"v": 1}));
    }

    #[test]
    fn test_normalize_empty_text_passes_through() {
        let value = PayloadCodec::normalize_body(ResponseBody::Text(String::new())).unwrap();
        assert_eq!(value, Value::String(String::new()));
    }

    #[test]
    fn test_normalize_structured_passes_through() {
        // A JSON string value is already structured and must not be decoded again
        let body = ResponseBody::Json(json!("{not-json}"));
        assert_eq!(PayloadCodec::normalize_body(body).unwrap(), json!("{not-json}"));

        let body = ResponseBody::Json(Value::Null);
        assert_eq!(PayloadCodec::normalize_body(body).unwrap(), Value::Null);
    }

    #[test]
    fn test_normalize_malformed_text() {
        let err = PayloadCodec::normalize_body(ResponseBody::Text("<html>".into())).unwrap_err();
        assert!(matches!(err, CodecError::MalformedJson(_)));
    }
}
