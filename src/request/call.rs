//! Executable HTTP call descriptions.
//!
//! An [`HttpCall`] is the fully resolved, transport-independent form of a
//! request descriptor: every default applied, every shorthand expanded.

use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::request::options::Attachment;

/// Basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CallBody {
    /// Serialized as JSON.
    Json(Value),
    /// Serialized as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Sent verbatim.
    Text(String),
    /// `multipart/form-data`: fields first, then attachments.
    Multipart {
        fields: Vec<(String, String)>,
        attachments: Vec<Attachment>,
    },
}

/// A resolved HTTP call, ready for a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub method: Method,
    pub url: Url,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub auth: Option<Credentials>,
    pub with_credentials: bool,
    /// `None` leaves the transport's default redirect policy in place.
    pub redirects: Option<u32>,
    pub body: Option<CallBody>,
}

impl HttpCall {
    /// A bare call with no options.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            content_type: None,
            accept: None,
            query: Vec::new(),
            headers: Vec::new(),
            auth: None,
            with_credentials: false,
            redirects: None,
            body: None,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Some(CallBody::Multipart { .. }))
    }
}
