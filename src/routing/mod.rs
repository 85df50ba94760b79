//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → matcher.rs (split path into segments)
//!     → router.rs (lookup on method + first segment)
//!     → Return: matched Route or None (404 at the dispatch boundary)
//!
//! Route Compilation (at startup):
//!     Handlers
//!     → RouteTable::new
//!     → Freeze as immutable table
//! ```

pub mod matcher;
pub mod router;

pub use matcher::PathSegments;
pub use router::{PayloadFormat, Route, RouteTable};
