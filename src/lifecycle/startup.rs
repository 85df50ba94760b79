//! Startup orchestration.
//!
//! # Responsibilities
//! - Parse command-line arguments
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Bind the listener and serve until a shutdown signal arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, traffic only arrives once everything is ready

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use metrics_exporter_prometheus::BuildError;
use tracing_subscriber::util::TryInitError;

use crate::config::{default_config, load_config, ConfigError, GatewayConfig};
use crate::handlers::Handlers;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::net::{self, ListenerError};
use crate::observability::{logging, metrics};

/// Command-line arguments of the gateway binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "fingerprint-gateway")]
#[command(about = "HTTP front-end for the fingerprint matching backend", long_about = None)]
pub struct Cli {
    /// TOML configuration file. Built-in defaults are used when absent.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Deployment environment, selects `<config>.<environment>.toml`.
    #[arg(short, long, env = "GATEWAY_ENV")]
    pub environment: Option<String>,

    /// Listen on this port instead of the configured one.
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("invalid metrics address {address}: {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Resolve the effective configuration for `cli`.
pub fn resolve_config(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let environment = cli.environment.as_deref();
    let mut config = match &cli.config {
        Some(path) => load_config(path, environment)?,
        None => default_config(environment)?,
    };
    if let Some(port) = cli.port {
        config.web_port = port;
    }
    Ok(config)
}

/// Run the gateway until it is asked to stop.
pub async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = resolve_config(&cli)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        backend = %config.backend.base_url(),
        request_timeout_ms = config.limits.request_timeout_ms,
        max_body_bytes = config.limits.max_body_bytes,
        "fingerprint-gateway starting"
    );

    if config.observability.metrics_enabled {
        let address = &config.observability.metrics_address;
        let addr = address
            .parse::<SocketAddr>()
            .map_err(|source| StartupError::MetricsAddress {
                address: address.clone(),
                source,
            })?;
        metrics::init_metrics(addr)?;
    }

    let listener = net::bind(&config).await?;
    let handlers = Handlers::upstream(&config);
    let server = HttpServer::new(config, handlers);

    let shutdown = Shutdown::new();
    let serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    match serving.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "Server task failed"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_config_file() {
        let cli = Cli::parse_from(["fingerprint-gateway"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.web_port, 37760);
    }

    #[test]
    fn port_flag_overrides_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "web_port = 8000").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from(["fingerprint-gateway", "--config", &path, "--port", "9001"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.web_port, 9001);
    }

    #[test]
    fn environment_flag_is_applied() {
        let cli = Cli::parse_from(["fingerprint-gateway", "--environment", "production"]);
        assert_eq!(resolve_config(&cli).unwrap().environment, "production");
    }
}
