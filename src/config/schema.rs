//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the fingerprint gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Port that the web server binds to.
    pub web_port: u16,

    /// Interface the web server binds to.
    pub bind_host: String,

    /// Application environment, selects the `config.<environment>.toml` overlay.
    pub environment: String,

    /// Per-request resource limits.
    pub limits: LimitsConfig,

    /// Matching backend the ingest/query operations are forwarded to.
    pub backend: BackendConfig,

    /// View templates.
    pub views: ViewsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            web_port: 37760,
            bind_host: "0.0.0.0".to_string(),
            environment: "development".to_string(),
            limits: LimitsConfig::default(),
            backend: BackendConfig::default(),
            views: ViewsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Socket address string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.web_port)
    }
}

/// Request limits enforced by the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Hard ceiling on accumulated POST body bytes.
    pub max_body_bytes: usize,

    /// Deadline for producing a response, in milliseconds.
    pub request_timeout_ms: u64,

    /// Maximum number of path segments kept when splitting the URL path.
    pub max_path_segments: usize,

    /// URL and referrer are cut to this many characters in the access log.
    pub log_truncate_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout_ms: 320_000,
            max_path_segments: 16,
            log_truncate_chars: 128,
        }
    }
}

impl LimitsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Address of the matching/indexing backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,

    pub port: u16,

    /// Per-call timeout towards the backend, in milliseconds.
    pub request_timeout_ms: u64,

    /// Largest backend reply that is relayed to the client.
    pub max_response_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8983,
            request_timeout_ms: 60_000,
            max_response_bytes: 16 * 1024 * 1024,
        }
    }
}

impl BackendConfig {
    /// Base URL of the backend, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Location of server-side view templates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub directory: String,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            directory: "views".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
