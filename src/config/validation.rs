//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! consistency. Every problem is reported, not just the first one.

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting all errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bind_host.trim().is_empty() {
        errors.push(ValidationError::new("bind_host", "must not be empty"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }
    if config.limits.request_timeout_ms == 0 {
        errors.push(ValidationError::new("limits.request_timeout_ms", "must be greater than 0"));
    }
    // segment[0] is always the empty string before the leading slash
    if config.limits.max_path_segments < 2 {
        errors.push(ValidationError::new("limits.max_path_segments", "must be at least 2"));
    }
    if config.limits.log_truncate_chars == 0 {
        errors.push(ValidationError::new("limits.log_truncate_chars", "must be greater than 0"));
    }
    if config.backend.host.trim().is_empty() {
        errors.push(ValidationError::new("backend.host", "must not be empty"));
    }
    if config.backend.request_timeout_ms == 0 {
        errors.push(ValidationError::new("backend.request_timeout_ms", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
