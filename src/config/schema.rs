//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resilience::settings::TripPolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TripwireConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// One entry per guarded dependency.
    pub breakers: Vec<BreakerConfig>,
}

/// Policy for a single breaker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerConfig {
    /// Unique breaker identifier, used in logs, metrics and notifications.
    pub name: String,

    /// Trial calls admitted while half-open (0 is treated as 1).
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Count flush interval while closed, in milliseconds (0 = never).
    #[serde(default)]
    pub interval_ms: u64,

    /// Time spent open before probing, in milliseconds (0 = 60s).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// When to trip from closed to open.
    #[serde(default)]
    pub trip: TripPolicy,
}

fn default_max_requests() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    60_000
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info" or "tripwire=debug").
    pub log_level: String,

    /// Emit breaker metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
