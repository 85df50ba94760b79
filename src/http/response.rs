//! Response finalization.
//!
//! # Responsibilities
//! - Stop the request timer before anything is written
//! - Derive Content-Type and Content-Length from the body
//! - Write the access-log line
//! - Hand the finished response to the connection, at most once
//!
//! # Design Decisions
//! - A [`Responder`] is cheap to clone; every clone targets the same request
//! - Losing the race against the timeout (or answering twice) is a no-op that
//!   reports `false`, never a panic
//! - Structured bodies are JSON, text bodies are served as HTML

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::http::error::{DispatchError, GENERIC_ERROR};
use crate::http::request::{RequestContext, X_REQUEST_ID};
use crate::http::views::ViewRenderer;
use crate::observability::logging::AccessRecord;
use crate::observability::metrics;
use crate::resilience::RequestTimer;

const JSON_CONTENT_TYPE: &str = "application/json";
const HTML_CONTENT_TYPE: &str = "text/html";

/// Body of a response.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    /// Text, served as `text/html`.
    Markup(String),
    /// Structured value, serialized as JSON.
    Data(Value),
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        ResponseBody::Data(value)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        ResponseBody::Markup(text)
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        ResponseBody::Markup(text.to_string())
    }
}

impl ResponseBody {
    fn content_type(&self) -> &'static str {
        match self {
            ResponseBody::Data(_) => JSON_CONTENT_TYPE,
            ResponseBody::Empty | ResponseBody::Markup(_) => HTML_CONTENT_TYPE,
        }
    }

    fn encode(self) -> Vec<u8> {
        match self {
            ResponseBody::Empty => Vec::new(),
            ResponseBody::Markup(text) => text.into_bytes(),
            // Serializing a `Value` cannot fail.
            ResponseBody::Data(value) => serde_json::to_vec(&value).unwrap_or_default(),
        }
    }
}

/// Assemble a response for `context` and write its access-log line.
///
/// Caller headers are kept, except that Content-Type and Content-Length are
/// always derived from the body. Content-Length is omitted for empty bodies.
pub fn finalize(
    context: &RequestContext,
    status: StatusCode,
    body: ResponseBody,
    mut headers: HeaderMap,
    truncate_at: usize,
) -> Response {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(body.content_type()));

    let bytes = body.encode();
    let length = (!bytes.is_empty()).then_some(bytes.len());
    match length {
        Some(len) => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
        None => {
            headers.remove(header::CONTENT_LENGTH);
        }
    }
    insert_request_id(&mut headers, context);

    AccessRecord {
        client: context.client(),
        timestamp: chrono::Utc::now(),
        method: context.method(),
        url: context.url(),
        version: context.version(),
        status,
        length,
        referrer: context.referrer(),
        user_agent: context.user_agent(),
        truncate_at,
    }
    .emit();
    metrics::record_request(context.method().as_str(), status.as_u16(), context.started());

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// The bare 503 sent when the request deadline passes.
pub fn timeout_response(context: &RequestContext) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    insert_request_id(response.headers_mut(), context);
    metrics::record_request(
        context.method().as_str(),
        StatusCode::SERVICE_UNAVAILABLE.as_u16(),
        context.started(),
    );
    response
}

fn insert_request_id(headers: &mut HeaderMap, context: &RequestContext) {
    if let Ok(value) = HeaderValue::from_str(&context.id().to_string()) {
        headers.insert(X_REQUEST_ID, value);
    }
}

struct Shared {
    context: Arc<RequestContext>,
    timer: Arc<RequestTimer>,
    slot: Mutex<Option<oneshot::Sender<Response>>>,
    views: Arc<dyn ViewRenderer>,
    truncate_at: usize,
}

/// Handle through which a request is answered.
#[derive(Clone)]
pub struct Responder {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("request_id", &self.shared.context.id())
            .field("timer", &self.shared.timer.state())
            .finish()
    }
}

impl Responder {
    /// Create the responder for a request, plus the receiving end the
    /// connection waits on.
    pub fn new(
        context: Arc<RequestContext>,
        timer: Arc<RequestTimer>,
        views: Arc<dyn ViewRenderer>,
        truncate_at: usize,
    ) -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let shared = Shared {
            context,
            timer,
            slot: Mutex::new(Some(tx)),
            views,
            truncate_at,
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    pub fn context(&self) -> &Arc<RequestContext> {
        &self.shared.context
    }

    /// Whether the request still awaits its response.
    pub fn is_open(&self) -> bool {
        self.shared.timer.state() == crate::resilience::TimerState::Armed
    }

    /// Send the response. `status` defaults to 200.
    ///
    /// Returns `false` without doing anything if the request was already
    /// answered or has timed out.
    pub fn respond(
        &self,
        status: Option<StatusCode>,
        body: impl Into<ResponseBody>,
        headers: Option<HeaderMap>,
    ) -> bool {
        let context = &self.shared.context;
        if !self.shared.timer.cancel() {
            tracing::debug!(
                request_id = %context.id(),
                timer = ?self.shared.timer.state(),
                "Request already closed, discarding response"
            );
            return false;
        }

        let response = finalize(
            context,
            status.unwrap_or(StatusCode::OK),
            body.into(),
            headers.unwrap_or_default(),
            self.shared.truncate_at,
        );

        let sender = match self.shared.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let delivered = sender.is_some_and(|tx| tx.send(response).is_ok());
        if !delivered {
            tracing::error!(
                request_id = %context.id(),
                "Error sending response to {}: connection closed",
                context.client().ip()
            );
            metrics::record_error("send");
        }
        true
    }

    /// Respond 200 with `body`.
    pub fn ok(&self, body: impl Into<ResponseBody>) -> bool {
        self.respond(None, body, None)
    }

    /// Render `template` with `options` and respond with the markup.
    ///
    /// A render failure is logged and answered with a 500.
    pub async fn render_view(
        &self,
        status: Option<StatusCode>,
        template: &str,
        options: &Value,
        headers: Option<HeaderMap>,
    ) -> bool {
        match self.shared.views.render(template, options).await {
            Ok(html) => self.respond(status, ResponseBody::Markup(html), headers),
            Err(err) => {
                tracing::error!(
                    request_id = %self.shared.context.id(),
                    error = %err,
                    "Failed to render {template}"
                );
                metrics::record_error("render");
                self.respond(
                    Some(StatusCode::INTERNAL_SERVER_ERROR),
                    "Internal server error",
                    headers,
                )
            }
        }
    }

    /// Convert a dispatch failure into its response.
    pub fn fail(&self, error: &DispatchError) -> bool {
        let context = &self.shared.context;
        let status = error.status();
        if !self.is_open() {
            tracing::debug!(
                request_id = %context.id(),
                error = %error,
                "Request already closed, not reporting failure"
            );
            metrics::record_error(error.kind());
            return false;
        }
        if status.is_server_error() {
            tracing::error!(
                request_id = %context.id(),
                client = %context.client(),
                error = %error,
                "{GENERIC_ERROR}"
            );
        } else {
            tracing::debug!(
                request_id = %context.id(),
                status = status.as_u16(),
                error = %error,
                "Rejecting request"
            );
        }
        metrics::record_error(error.kind());

        let mut headers = HeaderMap::new();
        if error.closes_connection() {
            headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        self.respond(
            Some(status),
            json!({ "error": error.client_message() }),
            Some(headers),
        )
    }
}
