//! Error taxonomy for request translation and response streams.
//!
//! Validation and response errors are local to a single response stream.
//! None of them ever terminates the stream-of-streams or a sibling response
//! stream. Only [`DriverError`] is raised before any request is seen.

use std::sync::Arc;
use thiserror::Error;

use crate::config::ConfigError;
use crate::response::Response;

/// A request descriptor could not be turned into an HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The descriptor was neither a URL string nor an options object.
    #[error("Observable of requests given to HTTP Driver must emit either URL strings or objects with parameters.")]
    UnsupportedDescriptor,

    /// An options object without a string `url`.
    #[error("Please provide a `url` property in the request options.")]
    MissingUrl,

    /// The `url` did not parse.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The `method` is not a valid HTTP method token.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// The options object had the wrong shape (e.g. a header that is not a string).
    #[error("invalid request options: {0}")]
    InvalidOptions(String),
}

/// Failure of a single response stream.
#[derive(Debug, Clone, Error)]
pub enum ResponseError {
    /// The descriptor was rejected before any I/O happened.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The exchange failed before a well-formed response arrived.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Arc<reqwest::Error>>,
    },

    /// The server answered with a 4xx/5xx status.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        response: Response,
    },

    /// A multipart attachment could not be read from disk.
    #[error("failed to read attachment '{path}': {reason}")]
    Attachment { path: String, reason: String },

    /// The stream was disposed before the call finished.
    #[error("request cancelled")]
    Cancelled,
}

impl ResponseError {
    /// Transport failure carrying only a diagnostic message.
    pub fn transport(message: impl Into<String>) -> Self {
        ResponseError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status of the failed exchange, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ResponseError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human readable message; the canonical reason phrase for status errors.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The raw response behind a status error.
    pub fn response(&self) -> Option<&Response> {
        match self {
            ResponseError::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseError::Validation(_) => "validation",
            ResponseError::Transport { .. } => "transport",
            ResponseError::Status { .. } => "status",
            ResponseError::Attachment { .. } => "attachment",
            ResponseError::Cancelled => "cancelled",
        }
    }
}

/// The driver could not be constructed.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<reqwest::Error> for ResponseError {
    fn from(e: reqwest::Error) -> Self {
        ResponseError::Transport {
            message: e.to_string(),
            source: Some(Arc::new(e)),
        }
    }
}
