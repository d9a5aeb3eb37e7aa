//! Completed HTTP exchanges.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde_json::Value;

/// A response as delivered to subscribers of a response stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw body text.
    pub text: String,
    /// Parsed body for JSON responses, `Null` otherwise.
    pub body: Value,
}

impl Response {
    /// A response with no headers and a plain text body.
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            text: text.into(),
            body: Value::Null,
        }
    }

    /// Build a response, parsing the body when the content type is JSON.
    pub fn from_parts(status: u16, headers: HeaderMap, text: String) -> Self {
        let body = if is_json(&headers) {
            serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::debug!(status, error = %e, "JSON response body did not parse");
                Value::Null
            })
        } else {
            Value::Null
        };
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    /// 4xx or 5xx.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("application/json") || ct.contains("+json")
        })
        .unwrap_or(false)
}
