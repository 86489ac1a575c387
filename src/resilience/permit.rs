//! Two-step admission.
//!
//! # Responsibilities
//! - Admit a call and remember the generation it was admitted under
//! - Report exactly one outcome for that call
//!
//! # Design Decisions
//! - Reporting consumes the permit, so an outcome is recorded at most once
//! - Dropping an unreported permit abandons the call: `requests` stays
//!   incremented until the next generation reset
//! - Every execution path reports through `run` or `guard`, so panics are
//!   handled the same way everywhere

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use futures_util::FutureExt;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::BreakerError;
use crate::resilience::state::Generation;

/// An admitted call awaiting its outcome.
#[derive(Debug)]
#[must_use = "an unreported permit is counted as an abandoned call"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: Generation,
    reported: bool,
}

impl CircuitBreaker {
    /// Admit a call, returning a permit to report its outcome with.
    pub fn allow(&self) -> Result<Permit<'_>, BreakerError> {
        let generation = self.before_call()?;
        Ok(Permit {
            breaker: self,
            generation,
            reported: false,
        })
    }
}

impl Permit<'_> {
    /// Generation this call was admitted under.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn record(mut self, success: bool) {
        self.reported = true;
        self.breaker.after_call(self.generation, success);
    }

    pub fn success(self) {
        self.record(true);
    }

    pub fn failure(self) {
        self.record(false);
    }

    /// Run `op` and report its outcome. A panic is recorded as a failure
    /// and then resumed.
    pub(crate) fn run<R, F, C>(self, op: F, classify: C) -> R
    where
        F: FnOnce() -> R,
        C: FnOnce(&R) -> bool,
    {
        match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(output) => {
                let success = classify(&output);
                self.record(success);
                output
            }
            Err(payload) => {
                tracing::warn!(breaker = %self.breaker.name(), "Guarded operation panicked");
                self.failure();
                panic::resume_unwind(payload)
            }
        }
    }

    /// Async counterpart of [`run`](Self::run).
    pub(crate) async fn guard<Fut, C>(self, fut: Fut, classify: C) -> Fut::Output
    where
        Fut: Future,
        C: FnOnce(&Fut::Output) -> bool,
    {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(output) => {
                let success = classify(&output);
                self.record(success);
                output
            }
            Err(payload) => {
                tracing::warn!(breaker = %self.breaker.name(), "Guarded future panicked");
                self.failure();
                panic::resume_unwind(payload)
            }
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.reported {
            tracing::debug!(
                breaker = %self.breaker.name(),
                generation = %self.generation,
                "Call abandoned without an outcome"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::resilience::settings::{Settings, TripPolicy};
    use crate::resilience::state::State;
    use super::*;

    #[test]
    fn test_permit_records_outcome() {
        let cb = CircuitBreaker::new(Settings::new("permit"));
        let permit = cb.allow().unwrap();
        assert_eq!(permit.generation(), Generation(0));
        permit.failure();

        let counts = cb.counts();
        assert_eq!(counts.requests, 1);
        assert_eq!(counts.total_failures, 1);
    }

    #[test]
    fn test_dropped_permit_is_abandoned() {
        let cb = CircuitBreaker::new(Settings::new("permit"));
        drop(cb.allow().unwrap());

        let counts = cb.counts();
        assert_eq!(counts.requests, 1);
        assert_eq!(counts.in_flight(), 1);
    }

    #[test]
    fn test_open_breaker_refuses_permit() {
        let cb = CircuitBreaker::new(
            Settings::new("permit")
                .with_trip_policy(TripPolicy::ConsecutiveFailures { threshold: 1 }),
        );
        cb.allow().unwrap().failure();
        assert_eq!(cb.state(), State::Open);
        assert!(cb.allow().unwrap_err().is_rejected());
    }

    #[test]
    fn test_run_records_panic_as_failure() {
        let cb = CircuitBreaker::new(Settings::new("permit"));
        let permit = cb.allow().unwrap();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            permit.run(|| -> u32 { panic!("boom") }, |_| true)
        }));

        assert!(caught.is_err());
        let counts = cb.counts();
        assert_eq!(counts.total_failures, 1);
        assert_eq!(counts.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_guard_uses_classifier() {
        let cb = CircuitBreaker::new(Settings::new("permit"));
        let status = cb.allow().unwrap().guard(async { 503u16 }, |s| *s < 500).await;

        assert_eq!(status, 503);
        assert_eq!(cb.counts().total_failures, 1);
    }
}
