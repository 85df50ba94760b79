//! Per-request context.
//!
//! # Responsibilities
//! - Capture everything the responder and access log need about a request
//!   before its body is handed off to the intake task
//! - Generate a unique request ID
//! - Split the path into routing segments and parse the query string
//!
//! # Design Decisions
//! - The context is immutable and shared via `Arc`; the body and the timer
//!   live elsewhere
//! - Captured as early as possible so even a timed-out request can be logged

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::{header, HeaderMap, Method, Request, Version};
use uuid::Uuid;

use crate::routing::PathSegments;

/// Response header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Metadata about one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    started: Instant,
    client: SocketAddr,
    method: Method,
    url: String,
    version: Version,
    segments: PathSegments,
    query: Vec<(String, String)>,
    referrer: String,
    user_agent: String,
}

impl RequestContext {
    /// Capture the context of `request`, received from `client`.
    pub fn from_request<B>(client: SocketAddr, request: &Request<B>, max_segments: usize) -> Self {
        let uri = request.uri();
        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        let query = uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            started: Instant::now(),
            client,
            method: request.method().clone(),
            url,
            version: request.version(),
            segments: PathSegments::parse(uri.path(), max_segments),
            query,
            referrer: referrer(request.headers()),
            user_agent: header_str(request.headers(), header::USER_AGENT.as_str()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn client(&self) -> SocketAddr {
        self.client
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and query as sent by the client.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn segments(&self) -> &PathSegments {
        &self.segments
    }

    /// Decoded query-string pairs, in order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value of a query-string parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn referrer(&self) -> &str {
        &self.referrer
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

// Both spellings are seen in the wild.
fn referrer(headers: &HeaderMap) -> String {
    let referer = header_str(headers, header::REFERER.as_str());
    if referer.is_empty() {
        header_str(headers, "referrer")
    } else {
        referer
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn client() -> SocketAddr {
        "192.0.2.7:40000".parse().unwrap()
    }

    #[test]
    fn captures_request_metadata() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("http://gateway.local/query?fp_code=abc%20def&version=4.12")
            .header("user-agent", "codegen/1.0")
            .header("referer", "http://example.org/")
            .body(Body::empty())
            .unwrap();

        let ctx = RequestContext::from_request(client(), &request, 16);
        assert_eq!(ctx.method(), &Method::GET);
        assert_eq!(ctx.url(), "/query?fp_code=abc%20def&version=4.12");
        assert_eq!(ctx.segments().first(), "query");
        assert_eq!(ctx.query_param("fp_code"), Some("abc def"));
        assert_eq!(ctx.query_param("version"), Some("4.12"));
        assert_eq!(ctx.query_param("missing"), None);
        assert_eq!(ctx.user_agent(), "codegen/1.0");
        assert_eq!(ctx.referrer(), "http://example.org/");
        assert_eq!(ctx.client(), client());
        assert_eq!(ctx.version(), Version::HTTP_11);
    }

    #[test]
    fn falls_back_to_referrer_spelling() {
        let request = Request::builder()
            .uri("/debug")
            .header("referrer", "http://alt.example/")
            .body(Body::empty())
            .unwrap();

        let ctx = RequestContext::from_request(client(), &request, 16);
        assert_eq!(ctx.referrer(), "http://alt.example/");
        assert_eq!(ctx.user_agent(), "");
        assert!(ctx.query().is_empty());
    }

    #[test]
    fn request_ids_are_unique() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let a = RequestContext::from_request(client(), &request, 16);
        let b = RequestContext::from_request(client(), &request, 16);
        assert_ne!(a.id(), b.id());
    }
}
