//! Fingerprint Gateway
//!
//! HTTP front-end for an audio fingerprint matching backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                 FINGERPRINT GATEWAY                   │
//!                         │                                                       │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌──────────────┐      │
//!     ────────────────────┼─▶│   net   │───▶│   http   │───▶│   routing    │      │
//!                         │  │listener │    │ dispatch │    │ method+path  │      │
//!                         │  └─────────┘    └────┬─────┘    └──────┬───────┘      │
//!                         │                      │                 │              │
//!                         │              ┌───────┴──────┐          ▼              │
//!                         │              │  resilience  │   ┌──────────────┐      │
//!                         │              │ request timer│   │   security   │      │
//!                         │              └───────┬──────┘   │  body limits │      │
//!                         │                      │          └──────┬───────┘      │
//!                         │                      │                 ▼              │
//!     Client Response     │               ┌──────┴─────┐    ┌──────────────┐      │
//!     ◀───────────────────┼───────────────│ responder  │◀───│   handlers   │◀─────┼──── Matching
//!                         │               │ access log │    │ upstream/view│      │     Backend
//!                         │               └────────────┘    └──────────────┘      │
//!                         │                                                       │
//!                         │   config · observability · lifecycle                  │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use fingerprint_gateway::lifecycle::{self, Cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    lifecycle::run(cli).await?;
    Ok(())
}
