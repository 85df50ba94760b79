//! Request body limits.
//!
//! # Responsibilities
//! - Accumulate a streamed request body in arrival order
//! - Enforce a hard byte ceiling on the accumulated size
//! - Reject a declared `Content-Length` above the ceiling before reading
//!
//! # Design Decisions
//! - Reading stops at the first chunk that crosses the ceiling; the rest of
//!   the body is never pulled from the connection
//! - Oversized bodies are a client input error (422), not 413

use axum::body::Body;
use axum::http::{header, HeaderMap};
use futures_util::StreamExt;

const MIB: usize = 1024 * 1024;

/// Failure while accumulating a request body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),
}

/// The `Content-Length` a client declared, if it is present and numeric.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Upper bound on the buffer reserved before any body bytes arrive.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Read `body` to the end, failing as soon as more than `limit` bytes arrive.
pub async fn read_limited(
    body: Body,
    declared: Option<u64>,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(BodyError::TooLarge { limit });
    }

    // Declared lengths are untrusted; grow with the bytes that actually arrive.
    let initial = declared.map_or(0, |len| len.min(INITIAL_CAPACITY as u64) as usize);
    let mut buf = Vec::with_capacity(initial);
    let mut stream = body.into_data_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if buf.len() + chunk.len() > limit {
            tracing::debug!(
                received = buf.len() + chunk.len(),
                limit,
                "Request body over limit, abandoning read"
            );
            return Err(BodyError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf)
}

/// Human-readable form of a byte limit, e.g. `10MB`.
pub fn limit_label(limit: usize) -> String {
    if limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format!("{limit} bytes")
    }
}
