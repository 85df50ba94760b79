//! Forwarding operations to the matching backend.
//!
//! # Responsibilities
//! - Build the backend request for an operation (`POST /<operation>` with a
//!   JSON body, or `GET /<operation>?<query>` for read-type requests)
//! - Bound the backend call with its own timeout
//! - Relay the backend's status and body to the client
//!
//! # Design Decisions
//! - JSON replies are relayed as structured data, anything else as markup
//! - Transport failures become `HandlerError`s (500 to the client); backend
//!   status codes are relayed as-is

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;

use crate::config::BackendConfig;
use crate::handlers::{Handler, HandlerError, HandlerRequest, Payload};
use crate::http::response::{Responder, ResponseBody};

/// Backend reply, ready to relay.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: ResponseBody,
}

/// HTTP client bound to the matching backend.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    base_url: String,
    timeout: Duration,
    max_response_bytes: usize,
}

impl UpstreamClient {
    pub fn new(config: &BackendConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            base_url: config.base_url(),
            timeout: config.request_timeout(),
            max_response_bytes: config.max_response_bytes,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invoke `operation` on the backend.
    ///
    /// `query` is only sent for read-type requests (an empty payload).
    pub async fn call(
        &self,
        operation: &str,
        payload: &Payload,
        query: &[(String, String)],
    ) -> Result<UpstreamReply, HandlerError> {
        let request = self.build_request(operation, payload, query)?;

        tracing::debug!(
            operation,
            uri = %request.uri(),
            method = %request.method(),
            "Forwarding to backend"
        );

        let response = match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(HandlerError::Unreachable(e.to_string())),
            Err(_) => return Err(HandlerError::Timeout(self.timeout)),
        };

        let status = response.status();
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), self.max_response_bytes)
            .await
            .map_err(|e| HandlerError::Reply(e.to_string()))?;

        let body = if bytes.is_empty() {
            ResponseBody::Empty
        } else if is_json {
            let value: Value =
                serde_json::from_slice(&bytes).map_err(|e| HandlerError::Reply(e.to_string()))?;
            ResponseBody::Data(value)
        } else {
            ResponseBody::Markup(String::from_utf8_lossy(&bytes).into_owned())
        };

        Ok(UpstreamReply { status, body })
    }

    fn build_request(
        &self,
        operation: &str,
        payload: &Payload,
        query: &[(String, String)],
    ) -> Result<Request<Body>, HandlerError> {
        let mut uri = format!("{}/{}", self.base_url, operation);

        let request = match payload {
            Payload::Empty => {
                if !query.is_empty() {
                    let encoded = url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(query)
                        .finish();
                    uri.push('?');
                    uri.push_str(&encoded);
                }
                Request::builder()
                    .method(Method::GET)
                    .uri(uri)
                    .body(Body::empty())?
            }
            payload => {
                let body = serde_json::to_vec(&payload.to_json())
                    .map_err(|e| HandlerError::Internal(e.to_string()))?;
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))?
            }
        };

        Ok(request)
    }
}

/// Handler that relays one operation to the backend.
pub struct UpstreamHandler {
    client: UpstreamClient,
    operation: &'static str,
}

impl UpstreamHandler {
    pub fn new(client: UpstreamClient, operation: &'static str) -> Self {
        Self { client, operation }
    }
}

#[async_trait]
impl Handler for UpstreamHandler {
    async fn call(&self, request: HandlerRequest, responder: Responder) -> Result<(), HandlerError> {
        let reply = self
            .client
            .call(self.operation, &request.payload, request.context.query())
            .await?;

        if reply.status.is_server_error() {
            tracing::warn!(
                operation = self.operation,
                status = reply.status.as_u16(),
                "Backend reported an error"
            );
        }

        responder.respond(Some(reply.status), reply.body, None);
        Ok(())
    }
}
