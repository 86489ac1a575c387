//! Breaker state, rolling counts and generation identifiers.
//!
//! # States
//! - Closed: normal operation, every call is admitted
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a bounded number of trial calls check for recovery
//!
//! # Design Decisions
//! - Counts are scoped to one generation and cleared on every reset
//! - Consecutive runs are mutually exclusive (one is always zero)
//! - Counters saturate instead of wrapping

use std::fmt;
use serde::Serialize;

/// Circuit breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    #[default]
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl State {
    /// Stable lowercase name, used for log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::HalfOpen => "half-open",
            State::Open => "open",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counting epoch identifier.
///
/// Bumped on every state transition and every periodic flush while closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Generation(pub u64);

impl Generation {
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<Generation> for u64 {
    fn from(generation: Generation) -> Self {
        generation.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rolling statistics for the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counts {
    /// Admitted calls, including ones still in flight.
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    pub(crate) fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Counts::default();
    }

    /// Fraction of admitted calls that failed, or `None` on an empty window.
    pub fn failure_ratio(&self) -> Option<f64> {
        if self.requests == 0 {
            return None;
        }
        Some(self.total_failures as f64 / self.requests as f64)
    }

    /// Calls admitted in this generation that have not reported an outcome.
    pub fn in_flight(&self) -> u32 {
        self.requests
            .saturating_sub(self.total_successes)
            .saturating_sub(self.total_failures)
    }
}
