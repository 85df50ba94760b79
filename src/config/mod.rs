//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.toml
//!     → loader.rs (parse, merge config.<environment>.toml over it)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed by reference / Arc to the server at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::{BackendConfig, GatewayConfig, LimitsConfig, LogFormat, ObservabilityConfig, ViewsConfig};
