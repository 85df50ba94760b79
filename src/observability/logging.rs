//! Structured logging and the access log.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from configuration
//! - Format one combined-style access line per response
//!
//! # Design Decisions
//! - `RUST_LOG` takes precedence over the configured level
//! - JSON format for production, pretty format for development
//! - Access lines go to their own target so they can be filtered separately

use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;

use axum::http::{Method, StatusCode, Version};
use chrono::{DateTime, Utc};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Target used for access-log events.
pub const ACCESS_TARGET: &str = "fingerprint_gateway::access";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
}

/// Cut `value` to `max_chars` characters, marking the cut with ` ...`.
pub fn truncate(value: &str, max_chars: usize) -> Cow<'_, str> {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => Cow::Owned(format!("{} ...", &value[..end])),
        None => Cow::Borrowed(value),
    }
}

/// Everything that goes into one access-log line.
#[derive(Debug, Clone)]
pub struct AccessRecord<'a> {
    pub client: SocketAddr,
    pub timestamp: DateTime<Utc>,
    pub method: &'a Method,
    pub url: &'a str,
    pub version: Version,
    pub status: StatusCode,
    /// Encoded body length; `None` renders as `-`.
    pub length: Option<usize>,
    pub referrer: &'a str,
    pub user_agent: &'a str,
    pub truncate_at: usize,
}

impl fmt::Display for AccessRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - - [{}] \"{} {} {:?}\" {} ",
            self.client.ip(),
            self.timestamp.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.method,
            truncate(self.url, self.truncate_at),
            self.version,
            self.status.as_u16(),
        )?;
        match self.length {
            Some(len) => write!(f, "{len}")?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            " \"{}\" \"{}\"",
            truncate(self.referrer, self.truncate_at),
            self.user_agent
        )
    }
}

impl AccessRecord<'_> {
    /// Emit the line at info level on the access target.
    pub fn emit(&self) {
        tracing::info!(
            target: ACCESS_TARGET,
            client = %self.client,
            status = self.status.as_u16(),
            "{}",
            self
        );
    }
}
