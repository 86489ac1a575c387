//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TripwireConfig (validated, immutable)
//!     → Settings::from_config per breaker
//!     → BreakerRegistry::from_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers never re-read it
//! - All fields except the breaker name have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BreakerConfig, ObservabilityConfig, TripwireConfig};
