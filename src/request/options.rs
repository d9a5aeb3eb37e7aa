//! Structured request options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A file to upload as one multipart part.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attachment {
    /// Form field name.
    pub name: String,
    /// Path of the file on disk.
    pub path: String,
    /// File name sent to the server; defaults to the last path component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            filename: None,
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Options describing one HTTP call.
///
/// Field names follow the wire form used by request producers, so a JSON
/// object such as `{"url": "...", "method": "POST", "withCredentials": true}`
/// deserializes directly. Unset fields take the documented defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub url: String,

    /// Kept exactly as given; normalized only at translation time.
    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<BTreeMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Multipart form fields. Scalar values are sent in their text form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<BTreeMap<String, Value>>,

    /// Multipart file attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach: Option<Vec<Attachment>>,

    #[serde(default)]
    pub with_credentials: bool,

    /// Extra request headers; numbers and booleans are sent as text.
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_redirects")]
    pub redirects: u32,

    /// Content-type shorthand (`json`, `form`, ...) or a full MIME type.
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,

    /// Start the call as soon as the driver sees it.
    #[serde(default)]
    pub eager: bool,

    /// Isolation scopes, in the order they were applied.
    #[serde(default, alias = "_namespace")]
    pub namespace: Vec<String>,
}

fn default_method() -> String {
    "get".to_string()
}

fn default_redirects() -> u32 {
    5
}

fn default_content_type() -> String {
    "json".to_string()
}

impl RequestOptions {
    /// Options for a GET to `url` with every other field at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            send: None,
            accept: None,
            query: None,
            user: None,
            password: None,
            field: None,
            attach: None,
            with_credentials: false,
            headers: BTreeMap::new(),
            redirects: default_redirects(),
            content_type: default_content_type(),
            eager: false,
            namespace: Vec::new(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn send(mut self, payload: impl Into<Value>) -> Self {
        self.send = Some(payload.into());
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Add one query parameter; repeated calls accumulate.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attach.get_or_insert_with(Vec::new).push(attachment);
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn redirects(mut self, redirects: u32) -> Self {
        self.redirects = redirects;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// Append an isolation scope.
    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.namespace.push(scope.into());
        self
    }
}
