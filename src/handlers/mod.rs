//! Operation handlers.
//!
//! The gateway does not match fingerprints itself. Each operation
//! (`ingest`, `ingestAll`, `query`, `queryAll`, `debug`) is a [`Handler`] that
//! receives the decoded request and answers through the [`Responder`] it is
//! given, possibly long after `call` returned.
//!
//! # Data Flow
//! ```text
//! RouteTable match + decoded payload
//!     → Handler::call(HandlerRequest, Responder)
//!     → upstream.rs (forward to the matching backend) / debug.rs (view)
//!     → Responder::respond
//! ```

pub mod debug;
pub mod upstream;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::GatewayConfig;
use crate::http::request::RequestContext;
use crate::http::response::Responder;

pub use debug::DebugHandler;
pub use upstream::{UpstreamClient, UpstreamHandler, UpstreamReply};

/// Decoded request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// Read-type request.
    #[default]
    Empty,
    Json(Value),
    /// URL-encoded fields in the order they were sent.
    Form(Vec<(String, String)>),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// First value of a form field.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Payload::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// The payload as a JSON value; form fields become an object where the
    /// last occurrence of a name wins.
    pub fn to_json(&self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Json(value) => value.clone(),
            Payload::Form(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

/// What a handler is given.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Name of the matched route.
    pub operation: &'static str,
    pub context: Arc<RequestContext>,
    pub payload: Payload,
}

/// Failure inside a handler. Details are logged, never sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("failed to build backend request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("unreadable backend reply: {0}")]
    Reply(String),

    #[error("{0}")]
    Internal(String),
}

/// An operation the dispatcher forwards requests to.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process `request` and eventually answer through `responder`.
    ///
    /// An `Err` is turned into a generic 500 if nothing was sent yet.
    async fn call(&self, request: HandlerRequest, responder: Responder) -> Result<(), HandlerError>;
}

/// One handler per gateway operation.
#[derive(Clone)]
pub struct Handlers {
    pub ingest: Arc<dyn Handler>,
    pub ingest_all: Arc<dyn Handler>,
    pub query: Arc<dyn Handler>,
    pub query_all: Arc<dyn Handler>,
    pub debug: Arc<dyn Handler>,
}

impl Handlers {
    /// Forward every operation to the configured matching backend.
    pub fn upstream(config: &GatewayConfig) -> Self {
        let client = UpstreamClient::new(&config.backend);
        let forward = |operation: &'static str| -> Arc<dyn Handler> {
            Arc::new(UpstreamHandler::new(client.clone(), operation))
        };

        Self {
            ingest: forward("ingest"),
            ingest_all: forward("ingestAll"),
            query: forward("query"),
            query_all: forward("queryAll"),
            debug: Arc::new(DebugHandler::new(client.clone())),
        }
    }

    /// Use the same handler for every operation.
    pub fn uniform(handler: Arc<dyn Handler>) -> Self {
        Self {
            ingest: Arc::clone(&handler),
            ingest_all: Arc::clone(&handler),
            query: Arc::clone(&handler),
            query_all: Arc::clone(&handler),
            debug: handler,
        }
    }
}
