//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, dispatch, timeout race)
//!     → request.rs (request ID, path segments, client metadata)
//!     → [routing layer picks the operation]
//!     → [security layer bounds the body]
//!     → [handler runs, answers through the responder]
//!     → response.rs (content headers, access log, single delivery)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;
pub mod views;

pub use error::{DispatchError, DispatchResult, GENERIC_ERROR, INVALID_ENDPOINT};
pub use request::{RequestContext, X_REQUEST_ID};
pub use response::{Responder, ResponseBody};
pub use server::{AppState, HttpServer};
pub use views::{TemplateDirectory, ViewError, ViewRenderer};
