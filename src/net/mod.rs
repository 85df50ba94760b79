//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayConfig (bind_host, web_port)
//!     → listener.rs (bind, report the bound port)
//!     → Hand off to HTTP layer (axum::serve)
//! ```

pub mod listener;

pub use listener::{bind, ListenerError};
