//! Breaker policy.
//!
//! # Responsibilities
//! - Hold the immutable per-breaker configuration
//! - Provide the built-in trip policies
//! - Convert file configuration into runtime settings
//!
//! # Design Decisions
//! - Settings are fixed once the breaker is built; no locking needed
//! - Zero `max_requests` means one trial call, zero `timeout` means 60s
//! - Built-in trip policies never trip on an empty window

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::config::schema::BreakerConfig;
use crate::resilience::notify::{Listener, StateChange};
use crate::resilience::state::Counts;

/// Open-state duration used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Consecutive failures that trip the default policy.
pub const DEFAULT_CONSECUTIVE_FAILURES: u32 = 6;

/// Predicate deciding `Closed -> Open` after a failure.
pub type TripPredicate = Arc<dyn Fn(&Counts) -> bool + Send + Sync>;

/// Predicate deciding whether an operation error still counts as a success.
pub type SuccessPredicate = Arc<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;

/// Built-in trip policies.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TripPolicy {
    /// Trip once `threshold` failures happened in a row.
    ConsecutiveFailures { threshold: u32 },

    /// Trip once at least `min_requests` were admitted and the failure
    /// ratio is at or above `ratio`.
    FailureRatio { min_requests: u32, ratio: f64 },
}

impl Default for TripPolicy {
    fn default() -> Self {
        TripPolicy::ConsecutiveFailures {
            threshold: DEFAULT_CONSECUTIVE_FAILURES,
        }
    }
}

impl TripPolicy {
    /// Evaluate the policy against the current window.
    pub fn should_trip(&self, counts: &Counts) -> bool {
        if counts.requests == 0 {
            return false;
        }
        match *self {
            TripPolicy::ConsecutiveFailures { threshold } => {
                counts.consecutive_failures >= threshold.max(1)
            }
            TripPolicy::FailureRatio { min_requests, ratio } => {
                counts.requests >= min_requests
                    && counts.failure_ratio().is_some_and(|r| r >= ratio)
            }
        }
    }

    fn into_predicate(self) -> TripPredicate {
        Arc::new(move |counts: &Counts| self.should_trip(counts))
    }
}

/// Immutable policy for one breaker.
#[derive(Clone)]
pub struct Settings {
    pub(crate) name: String,
    pub(crate) interval: Duration,
    pub(crate) timeout: Duration,
    pub(crate) max_requests: u32,
    pub(crate) ready_to_trip: TripPredicate,
    pub(crate) is_successful: SuccessPredicate,
    pub(crate) listeners: Vec<Listener>,
    pub(crate) metrics: bool,
}

impl Settings {
    /// Default settings for a breaker called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            max_requests: 1,
            ready_to_trip: TripPolicy::default().into_predicate(),
            is_successful: Arc::new(|_: &(dyn StdError + 'static)| false),
            listeners: Vec::new(),
            metrics: true,
        }
    }

    /// Build settings from a file configuration entry.
    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.name.clone())
            .with_max_requests(config.max_requests)
            .with_interval(Duration::from_millis(config.interval_ms))
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_trip_policy(config.trip.clone())
    }

    /// Rename the breaker.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Flush interval for counts while closed. Zero disables flushing.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Time spent open before trial calls are admitted.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        self
    }

    /// Trial call cap while half-open; also the success run that closes it.
    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests.max(1);
        self
    }

    /// Install a built-in trip policy.
    pub fn with_trip_policy(mut self, policy: TripPolicy) -> Self {
        self.ready_to_trip = policy.into_predicate();
        self
    }

    /// Install a custom trip predicate.
    ///
    /// The predicate is responsible for treating an empty window as "not ready".
    pub fn with_ready_to_trip<F>(mut self, f: F) -> Self
    where
        F: Fn(&Counts) -> bool + Send + Sync + 'static,
    {
        self.ready_to_trip = Arc::new(f);
        self
    }

    /// Classify some operation errors as successes (e.g. "not found").
    pub fn with_is_successful<F>(mut self, f: F) -> Self
    where
        F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
    {
        self.is_successful = Arc::new(f);
        self
    }

    /// Add a state change listener.
    pub fn with_listener<F>(mut self, f: F) -> Self
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(f));
        self
    }

    /// Add an already shared listener, e.g. from `notify::channel_listener`.
    pub fn with_shared_listener(mut self, listener: Listener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Enable or disable metric emission.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("max_requests", &self.max_requests)
            .field("listeners", &self.listeners.len())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
