//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, responder and supervisor produce:
//!     → logging.rs (structured events, one access line per response)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
