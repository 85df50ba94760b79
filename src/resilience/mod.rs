//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives:
//!     → timeouts.rs (arm the request timer)
//!     → dispatch runs concurrently with timeouts::supervise
//!     → first of {response, deadline} wins, the other is a no-op
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every request has a deadline
//! - Timed-out requests return 503 Service Unavailable with no body
//! - Backend work is never cancelled, late answers are discarded

pub mod timeouts;

pub use timeouts::{supervise, RequestTimer, Supervised, TimerState};
