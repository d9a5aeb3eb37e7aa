//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, log level, user agent)
//!
//! All errors are collected, not just the first.

use std::fmt;

use crate::config::schema::DriverConfig;

/// Log levels accepted by `observability.log_level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, returning every problem found.
pub fn validate_config(config: &DriverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.transport.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "transport.connect_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.transport.request_timeout_secs != 0
        && config.transport.request_timeout_secs < config.transport.connect_timeout_secs
    {
        errors.push(ValidationError::new(
            "transport.request_timeout_secs",
            "must be 0 (disabled) or at least transport.connect_timeout_secs",
        ));
    }

    if config.transport.user_agent.trim().is_empty() {
        errors.push(ValidationError::new("transport.user_agent", "must not be empty"));
    } else if reqwest::header::HeaderValue::from_str(&config.transport.user_agent).is_err() {
        errors.push(ValidationError::new(
            "transport.user_agent",
            "must be a valid header value",
        ));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
