//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject empty and duplicate breaker names
//! - Validate trip policy ranges
//! - Check the log filter parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TripwireConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::TripwireConfig;
use crate::resilience::settings::TripPolicy;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("breaker #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("breaker '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("breaker '{name}': failure ratio {ratio} must be in (0, 1]")]
    InvalidRatio { name: String, ratio: f64 },

    #[error("breaker '{name}': consecutive failure threshold must be at least 1")]
    ZeroThreshold { name: String },

    #[error("invalid log filter '{filter}': {reason}")]
    InvalidLogFilter { filter: String, reason: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &TripwireConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, breaker) in config.breakers.iter().enumerate() {
        let name = breaker.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyName { index });
        } else if !seen.insert(name) {
            errors.push(ValidationError::DuplicateName(name.to_string()));
        }

        match breaker.trip {
            TripPolicy::ConsecutiveFailures { threshold: 0 } => {
                errors.push(ValidationError::ZeroThreshold {
                    name: breaker.name.clone(),
                });
            }
            TripPolicy::FailureRatio { ratio, .. } if !(ratio > 0.0 && ratio <= 1.0) => {
                errors.push(ValidationError::InvalidRatio {
                    name: breaker.name.clone(),
                    ratio,
                });
            }
            _ => {}
        }
    }

    if let Err(e) = EnvFilter::try_new(&config.observability.log_level) {
        errors.push(ValidationError::InvalidLogFilter {
            filter: config.observability.log_level.clone(),
            reason: e.to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
