//! Metrics collection.
//!
//! # Metrics
//! - `tripwire_state_transitions_total` (counter): transitions by breaker, from, to
//! - `tripwire_rejections_total` (counter): refused calls by breaker, reason
//! - `tripwire_calls_total` (counter): recorded outcomes by breaker, outcome
//! - `tripwire_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Uses the `metrics` facade; installing an exporter is up to the host
//! - Without a recorder every call here is a no-op

use metrics::{counter, gauge};

use crate::resilience::state::State;

/// Record a state transition and update the state gauge.
pub fn record_state_change(breaker: &str, from: State, to: State) {
    counter!(
        "tripwire_state_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    record_state(breaker, to);
}

/// Set the state gauge.
pub fn record_state(breaker: &str, state: State) {
    gauge!("tripwire_state", "breaker" => breaker.to_string()).set(state as u8 as f64);
}

/// Record a call refused by admission control.
pub fn record_rejection(breaker: &str, reason: &'static str) {
    counter!(
        "tripwire_rejections_total",
        "breaker" => breaker.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a reported call outcome.
pub fn record_outcome(breaker: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "tripwire_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
