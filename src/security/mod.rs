//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming write-type request:
//!     → limits.rs (declared length check, bounded body accumulation)
//!     → Pass assembled body to payload decoding
//! ```
//!
//! # Design Decisions
//! - Fail closed: a body over the ceiling is never handed to a handler
//! - No trust in client input; declared lengths are only used to reject early

pub mod limits;

pub use limits::{declared_length, limit_label, read_limited, BodyError};
