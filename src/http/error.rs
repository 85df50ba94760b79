//! Dispatch failures and how they map to responses.

use axum::http::StatusCode;

use crate::handlers::HandlerError;
use crate::security::{limit_label, BodyError};

/// Body returned for every server-side fault.
pub const GENERIC_ERROR: &str = "An unknown error has occurred";

/// Body returned for unmatched routes.
pub const INVALID_ENDPOINT: &str = "Invalid API endpoint";

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Everything that can go wrong between accepting a request and a handler
/// taking it over. Converted to a response exactly once, at the dispatch
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no route for this method and path")]
    RouteNotFound,

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("request body is empty")]
    EmptyBody,

    #[error("failed to read request body: {0}")]
    BodyRead(#[source] axum::Error),

    #[error("failed to decode {route} payload: {source}")]
    Decode {
        route: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{route} handler failed: {source}")]
    Handler {
        route: &'static str,
        #[source]
        source: HandlerError,
    },
}

impl From<BodyError> for DispatchError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::TooLarge { limit } => DispatchError::BodyTooLarge { limit },
            BodyError::Read(e) => DispatchError::BodyRead(e),
        }
    }
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RouteNotFound => StatusCode::NOT_FOUND,
            DispatchError::BodyTooLarge { .. }
            | DispatchError::EmptyBody
            | DispatchError::BodyRead(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::Decode { .. } | DispatchError::Handler { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text placed in the `error` field of the response. Never carries
    /// internal detail.
    pub fn client_message(&self) -> String {
        match self {
            DispatchError::RouteNotFound => INVALID_ENDPOINT.to_string(),
            DispatchError::BodyTooLarge { limit } => {
                format!("POST size cannot exceed {}", limit_label(*limit))
            }
            DispatchError::EmptyBody => "POST query must contain body".to_string(),
            DispatchError::BodyRead(_) => "Failed to read POST body".to_string(),
            DispatchError::Decode { .. } | DispatchError::Handler { .. } => {
                GENERIC_ERROR.to_string()
            }
        }
    }

    /// Label for the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::RouteNotFound => "route_not_found",
            DispatchError::BodyTooLarge { .. } => "body_too_large",
            DispatchError::EmptyBody => "empty_body",
            DispatchError::BodyRead(_) => "body_read",
            DispatchError::Decode { .. } => "decode",
            DispatchError::Handler { .. } => "handler",
        }
    }

    /// Unread input is left on the connection, so it cannot be reused.
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            DispatchError::BodyTooLarge { .. } | DispatchError::BodyRead(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_explain_themselves() {
        let err = DispatchError::BodyTooLarge { limit: 10 * 1024 * 1024 };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.client_message(), "POST size cannot exceed 10MB");
        assert!(err.closes_connection());

        assert_eq!(DispatchError::EmptyBody.client_message(), "POST query must contain body");
        assert_eq!(DispatchError::RouteNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(DispatchError::RouteNotFound.client_message(), "Invalid API endpoint");
    }

    #[test]
    fn server_faults_stay_generic() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = DispatchError::Decode { route: "ingest", source };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), GENERIC_ERROR);
        assert!(err.to_string().contains("ingest"));

        let err = DispatchError::Handler {
            route: "query",
            source: HandlerError::Internal("index offline".into()),
        };
        assert_eq!(err.client_message(), GENERIC_ERROR);
        assert!(!err.client_message().contains("index offline"));
    }
}
