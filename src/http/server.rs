//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single dispatching fallback
//! - Capture the request context and arm the request timer
//! - Route on method + first path segment
//! - Accumulate and decode write-type bodies within the size limit
//! - Hand decoded requests to operation handlers
//! - Race the handler's answer against the deadline
//!
//! Each request is split in two: the intake task (routing, body, handler)
//! runs on its own, while the connection future waits on the supervisor.
//! Whichever of {responder, deadline} finishes first answers the client.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, LimitsConfig};
use crate::handlers::{HandlerRequest, Handlers, Payload};
use crate::http::error::{DispatchError, DispatchResult, GENERIC_ERROR};
use crate::http::request::RequestContext;
use crate::http::response::{finalize, timeout_response, Responder, ResponseBody};
use crate::http::views::{TemplateDirectory, ViewRenderer};
use crate::observability::metrics;
use crate::resilience::{supervise, RequestTimer, Supervised};
use crate::routing::{PayloadFormat, RouteTable};
use crate::security::{declared_length, read_limited};

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub views: Arc<dyn ViewRenderer>,
    pub limits: LimitsConfig,
}

/// HTTP front-end for the fingerprint backend.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a server rendering views from the configured directory.
    pub fn new(config: GatewayConfig, handlers: Handlers) -> Self {
        let views = Arc::new(TemplateDirectory::new(&config.views.directory));
        Self::with_views(config, handlers, views)
    }

    /// Create a server with a custom view renderer.
    pub fn with_views(
        config: GatewayConfig,
        handlers: Handlers,
        views: Arc<dyn ViewRenderer>,
    ) -> Self {
        let state = AppState {
            routes: Arc::new(RouteTable::new(handlers)),
            views,
            limits: config.limits.clone(),
        };

        Self {
            router: Self::build_router(state),
            config: Arc::new(config),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The request router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve connections from `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Entry point for every request.
async fn dispatch(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let context = Arc::new(RequestContext::from_request(
        client,
        &request,
        state.limits.max_path_segments,
    ));
    let timer = Arc::new(RequestTimer::arm(state.limits.request_timeout()));
    let truncate_at = state.limits.log_truncate_chars;
    let (responder, pending) = Responder::new(
        Arc::clone(&context),
        Arc::clone(&timer),
        Arc::clone(&state.views),
        truncate_at,
    );

    tracing::debug!(
        request_id = %context.id(),
        method = %context.method(),
        url = %context.url(),
        "Dispatching request"
    );

    tokio::spawn(async move {
        if let Err(error) = intake(&state, request, &responder).await {
            responder.fail(&error);
        }
    });

    match supervise(&timer, pending).await {
        Supervised::Answered(response) => response,
        Supervised::TimedOut => {
            tracing::error!(
                request_id = %context.id(),
                timeout = ?timer.timeout(),
                "Timed out while responding to a request from {}",
                context.client().ip()
            );
            metrics::record_timeout();
            timeout_response(&context)
        }
        Supervised::Abandoned => {
            tracing::error!(
                request_id = %context.id(),
                "Request from {} was dropped without a response",
                context.client().ip()
            );
            metrics::record_error("abandoned");
            if timer.cancel() {
                finalize(
                    &context,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ResponseBody::Data(json!({ "error": GENERIC_ERROR })),
                    HeaderMap::new(),
                    truncate_at,
                )
            } else {
                timeout_response(&context)
            }
        }
    }
}

/// Route the request, assemble its payload and invoke the handler.
async fn intake(
    state: &AppState,
    request: Request<Body>,
    responder: &Responder,
) -> DispatchResult<()> {
    let context = Arc::clone(responder.context());
    let route = state
        .routes
        .lookup(context.method(), context.segments().first())
        .ok_or(DispatchError::RouteNotFound)?
        .clone();
    metrics::record_dispatch(route.name);

    let payload = match route.payload {
        PayloadFormat::None => Payload::Empty,
        format => {
            let declared = declared_length(request.headers());
            let body =
                read_limited(request.into_body(), declared, state.limits.max_body_bytes).await?;
            if body.is_empty() {
                return Err(DispatchError::EmptyBody);
            }
            decode(route.name, format, &body)?
        }
    };

    let request = HandlerRequest {
        operation: route.name,
        context,
        payload,
    };
    route
        .handler
        .call(request, responder.clone())
        .await
        .map_err(|source| DispatchError::Handler {
            route: route.name,
            source,
        })
}

fn decode(route: &'static str, format: PayloadFormat, body: &[u8]) -> DispatchResult<Payload> {
    match format {
        PayloadFormat::None => Ok(Payload::Empty),
        PayloadFormat::Json => serde_json::from_slice(body)
            .map(Payload::Json)
            .map_err(|source| DispatchError::Decode { route, source }),
        PayloadFormat::Form => Ok(Payload::Form(
            url::form_urlencoded::parse(body).into_owned().collect(),
        )),
    }
}
