//! TCP listener setup.
//!
//! # Responsibilities
//! - Resolve the configured bind address
//! - Bind the listening socket
//! - Announce the port actually bound (port 0 picks a free one)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::GatewayConfig;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The configured host/port is not a socket address.
    #[error("Invalid bind address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind the listener for the gateway's HTTP port.
pub async fn bind(config: &GatewayConfig) -> Result<TcpListener, ListenerError> {
    let address = config.bind_address();
    let addr: SocketAddr = address
        .parse()
        .map_err(|source| ListenerError::Address {
            address: address.clone(),
            source,
        })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    tracing::info!(address = %local_addr, "HTTP listening on port {}", local_addr.port());

    Ok(listener)
}
