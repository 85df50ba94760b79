//! Fingerprint Gateway Library
//!
//! Request dispatching, per-request timeouts and response delivery in front of
//! a fingerprint matching backend.

// Core subsystems
pub mod config;
pub mod handlers;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use handlers::{Handler, HandlerError, HandlerRequest, Handlers, Payload};
pub use http::{HttpServer, Responder, ResponseBody};
pub use lifecycle::Shutdown;
