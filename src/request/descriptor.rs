//! Request descriptors: what a producer emits to ask for one HTTP call.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::request::options::RequestOptions;

/// Key under which isolation scopes are stored on option objects.
pub const NAMESPACE_KEY: &str = "namespace";

/// Older producers store scopes under this key instead.
pub const LEGACY_NAMESPACE_KEY: &str = "_namespace";

/// One HTTP call to make.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestDescriptor {
    /// A bare URL: an implicit GET with no options.
    Url(String),
    /// A structured options record.
    Options(Box<RequestOptions>),
    /// A dynamically supplied value that is neither a URL nor a valid
    /// options record. It still gets its own response stream, which fails
    /// with the matching validation error.
    Malformed(Value),
}

impl RequestDescriptor {
    /// The target URL, when the descriptor has one.
    pub fn url(&self) -> Option<&str> {
        match self {
            RequestDescriptor::Url(url) => Some(url.as_str()),
            RequestDescriptor::Options(opts) => Some(opts.url.as_str()),
            RequestDescriptor::Malformed(value) => value.get("url").and_then(Value::as_str),
        }
    }

    /// The method as given by the producer (`get` for bare URLs).
    pub fn method(&self) -> Option<&str> {
        match self {
            RequestDescriptor::Url(_) => Some("get"),
            RequestDescriptor::Options(opts) => Some(opts.method.as_str()),
            RequestDescriptor::Malformed(value) => value.get("method").and_then(Value::as_str),
        }
    }

    pub fn options(&self) -> Option<&RequestOptions> {
        match self {
            RequestDescriptor::Options(opts) => Some(opts.as_ref()),
            _ => None,
        }
    }

    /// True for URL strings and objects, the only shapes the driver accepts.
    pub fn is_supported(&self) -> bool {
        match self {
            RequestDescriptor::Url(_) | RequestDescriptor::Options(_) => true,
            RequestDescriptor::Malformed(value) => value.is_object(),
        }
    }

    /// Per-request override of the driver's eager policy.
    pub fn is_eager(&self) -> bool {
        match self {
            RequestDescriptor::Options(opts) => opts.eager,
            RequestDescriptor::Malformed(value) => {
                value.get("eager").and_then(Value::as_bool).unwrap_or(false)
            }
            RequestDescriptor::Url(_) => false,
        }
    }

    /// Isolation scopes attached to this descriptor, in the order applied.
    pub fn namespace(&self) -> Vec<&str> {
        match self {
            RequestDescriptor::Url(_) => Vec::new(),
            RequestDescriptor::Options(opts) => opts.namespace.iter().map(String::as_str).collect(),
            RequestDescriptor::Malformed(value) => value
                .as_object()
                .and_then(|map| map.get(namespace_key(map)))
                .and_then(Value::as_array)
                .map(|scopes| scopes.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default(),
        }
    }

    /// Membership test used by response filtering; order is irrelevant.
    pub fn in_scope(&self, scope: &str) -> bool {
        self.namespace().contains(&scope)
    }

    /// Return this descriptor tagged with one more isolation scope.
    ///
    /// A bare URL is promoted to an options record. Malformed values that are
    /// not objects cannot carry a namespace and are returned unchanged.
    pub fn with_scope(self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        match self {
            RequestDescriptor::Url(url) => {
                RequestDescriptor::Options(Box::new(RequestOptions::new(url).scoped(scope)))
            }
            RequestDescriptor::Options(mut opts) => {
                opts.namespace.push(scope);
                RequestDescriptor::Options(opts)
            }
            RequestDescriptor::Malformed(Value::Object(mut map)) => {
                let key = namespace_key(&map);
                let entry = map
                    .entry(key)
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !entry.is_array() {
                    *entry = Value::Array(Vec::new());
                }
                if let Value::Array(scopes) = entry {
                    scopes.push(Value::String(scope));
                }
                RequestDescriptor::Malformed(Value::Object(map))
            }
            other => other,
        }
    }
}

/// `namespace` unless only the legacy key holds scopes.
fn namespace_key(map: &Map<String, Value>) -> &'static str {
    if !map.contains_key(NAMESPACE_KEY)
        && map.get(LEGACY_NAMESPACE_KEY).is_some_and(Value::is_array)
    {
        LEGACY_NAMESPACE_KEY
    } else {
        NAMESPACE_KEY
    }
}

impl From<&str> for RequestDescriptor {
    fn from(url: &str) -> Self {
        RequestDescriptor::Url(url.to_string())
    }
}

impl From<String> for RequestDescriptor {
    fn from(url: String) -> Self {
        RequestDescriptor::Url(url)
    }
}

impl From<RequestOptions> for RequestDescriptor {
    fn from(opts: RequestOptions) -> Self {
        RequestDescriptor::Options(Box::new(opts))
    }
}

impl From<Value> for RequestDescriptor {
    fn from(value: Value) -> Self {
        match value {
            Value::String(url) => RequestDescriptor::Url(url),
            Value::Object(_) => match serde_json::from_value::<RequestOptions>(value.clone()) {
                Ok(opts) => RequestDescriptor::Options(Box::new(opts)),
                Err(_) => RequestDescriptor::Malformed(value),
            },
            other => RequestDescriptor::Malformed(other),
        }
    }
}

impl Serialize for RequestDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RequestDescriptor::Url(url) => serializer.serialize_str(url),
            RequestDescriptor::Options(opts) => opts.serialize(serializer),
            RequestDescriptor::Malformed(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RequestDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RequestDescriptor::from)
    }
}

impl std::fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.method(), self.url()) {
            (Some(method), Some(url)) => write!(f, "{} {}", method.to_uppercase(), url),
            _ => write!(f, "<malformed request>"),
        }
    }
}
