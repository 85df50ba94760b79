//! Route lookup.
//!
//! # Design Decisions
//! - Immutable after construction (shared via `Arc` without locks)
//! - Keyed by method, then by first path segment
//! - Explicit `None` for no match; the caller owns the 404

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::handlers::{Handler, Handlers};

/// How a route's request body is decoded before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Read-type request, the body is not consumed.
    None,
    /// Serialized JSON document.
    Json,
    /// `application/x-www-form-urlencoded` fields.
    Form,
}

/// A dispatch target.
#[derive(Clone)]
pub struct Route {
    /// Operation name, used for logs and metrics.
    pub name: &'static str,
    pub payload: PayloadFormat,
    pub handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// Static mapping from `(method, first path segment)` to a route.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<Method, HashMap<&'static str, Route>>,
}

impl RouteTable {
    /// Build the gateway's route table from its operation handlers.
    pub fn new(handlers: Handlers) -> Self {
        let mut table = Self::default();

        table.insert(Method::GET, "query", PayloadFormat::None, &handlers.query);
        table.insert(Method::GET, "debug", PayloadFormat::None, &handlers.debug);

        table.insert(Method::POST, "ingest", PayloadFormat::Json, &handlers.ingest);
        table.insert(Method::POST, "ingestAll", PayloadFormat::Json, &handlers.ingest_all);
        table.insert(Method::POST, "query", PayloadFormat::Json, &handlers.query);
        table.insert(Method::POST, "queryAll", PayloadFormat::Json, &handlers.query_all);
        table.insert(Method::POST, "debug", PayloadFormat::Form, &handlers.debug);

        table
    }

    fn insert(
        &mut self,
        method: Method,
        name: &'static str,
        payload: PayloadFormat,
        handler: &Arc<dyn Handler>,
    ) {
        self.routes.entry(method).or_default().insert(
            name,
            Route {
                name,
                payload,
                handler: Arc::clone(handler),
            },
        );
    }

    /// Find the route for a request, if any.
    pub fn lookup(&self, method: &Method, segment: &str) -> Option<&Route> {
        self.routes.get(method)?.get(segment)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerError, HandlerRequest};
    use crate::http::response::Responder;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Handler for Noop {
        async fn call(&self, _: HandlerRequest, _: Responder) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn table() -> RouteTable {
        let noop: Arc<dyn Handler> = Arc::new(Noop);
        RouteTable::new(Handlers::uniform(noop))
    }

    #[test]
    fn registers_all_operations() {
        let table = table();
        assert_eq!(table.len(), 7);

        let route = table.lookup(&Method::POST, "ingestAll").unwrap();
        assert_eq!(route.name, "ingestAll");
        assert_eq!(route.payload, PayloadFormat::Json);

        assert_eq!(table.lookup(&Method::POST, "debug").unwrap().payload, PayloadFormat::Form);
        assert_eq!(table.lookup(&Method::GET, "query").unwrap().payload, PayloadFormat::None);
    }

    #[test]
    fn unknown_pairs_do_not_match() {
        let table = table();
        assert!(table.lookup(&Method::GET, "ingest").is_none());
        assert!(table.lookup(&Method::GET, "queryAll").is_none());
        assert!(table.lookup(&Method::PUT, "query").is_none());
        assert!(table.lookup(&Method::POST, "").is_none());
        assert!(table.lookup(&Method::DELETE, "debug").is_none());
    }
}
