//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: trip predicate true after a failure
//! Closed → Closed: flush interval elapsed (new generation, counts reset)
//! Open → Half-Open: after open timeout
//! Half-Open → Closed: max_requests consecutive successes
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One breaker per guarded dependency (not global)
//! - State, counts, generation and expiry live under a single mutex
//! - The guarded operation never runs under the lock
//! - Outcomes carry the generation they were admitted under; stale ones are dropped

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::Serialize;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::error::BreakerError;
use crate::resilience::notify::StateChange;
use crate::resilience::settings::Settings;
use crate::resilience::state::{Counts, Generation, State};

/// Stand-in for an open timeout too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: State,
    pub generation: Generation,
    pub counts: Counts,
    /// Remaining open time, if currently open.
    pub open_remaining: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: State,
    generation: Generation,
    counts: Counts,
    expiry: Option<Instant>,
}

/// Concurrency-safe circuit breaker.
///
/// Share it between callers with an `Arc`.
pub struct CircuitBreaker {
    settings: Settings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a closed breaker at generation 0.
    pub fn new(settings: Settings) -> Self {
        let now = Instant::now();
        let expiry = closed_expiry(&settings, now);

        if settings.metrics {
            metrics::record_state(&settings.name, State::Closed);
        }

        Self {
            settings,
            inner: Mutex::new(Inner {
                state: State::Closed,
                generation: Generation::default(),
                counts: Counts::default(),
                expiry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current state, applying any time-based transition that is due.
    pub fn state(&self) -> State {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now())
    }

    /// Counts of the current generation.
    pub fn counts(&self) -> Counts {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now());
        inner.counts
    }

    pub fn generation(&self) -> Generation {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now());
        inner.generation
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let mut inner = self.lock();
        let state = self.current_state(&mut inner, now);
        let open_remaining = match (state, inner.expiry) {
            (State::Open, Some(until)) if until > now => Some(until - now),
            _ => None,
        };
        BreakerSnapshot {
            name: self.settings.name.clone(),
            state,
            generation: inner.generation,
            counts: inner.counts,
            open_remaining,
        }
    }

    /// Admission check. Returns the generation the call is admitted under.
    pub fn before_call(&self) -> Result<Generation, BreakerError> {
        let now = Instant::now();
        let mut inner = self.lock();

        match self.current_state(&mut inner, now) {
            State::Open => {
                self.reject("open");
                return Err(BreakerError::Open {
                    name: self.settings.name.clone(),
                });
            }
            State::HalfOpen if inner.counts.requests >= self.settings.max_requests => {
                self.reject("too_many_requests");
                return Err(BreakerError::TooManyRequests {
                    name: self.settings.name.clone(),
                });
            }
            _ => {}
        }

        inner.counts.on_request();
        Ok(inner.generation)
    }

    /// Record the outcome of a call admitted under `generation`.
    pub fn after_call(&self, generation: Generation, success: bool) {
        let now = Instant::now();
        let mut inner = self.lock();

        // Checked before and after time-based transitions: a stale outcome
        // must not be what moves the breaker forward.
        if self.is_stale(&inner, generation) {
            return;
        }
        let state = self.current_state(&mut inner, now);
        if self.is_stale(&inner, generation) {
            return;
        }

        if self.settings.metrics {
            metrics::record_outcome(&self.settings.name, success);
        }

        if success {
            self.on_success(&mut inner, state, now);
        } else {
            self.on_failure(&mut inner, state, now);
        }
    }

    fn is_stale(&self, inner: &Inner, generation: Generation) -> bool {
        if generation == inner.generation {
            return false;
        }
        tracing::trace!(
            breaker = %self.settings.name,
            stale = %generation,
            current = %inner.generation,
            "Discarding outcome from previous generation"
        );
        true
    }

    fn on_success(&self, inner: &mut Inner, state: State, now: Instant) {
        inner.counts.on_success();
        if state == State::HalfOpen
            && inner.counts.consecutive_successes >= self.settings.max_requests
        {
            self.set_state(inner, State::Closed, now);
        }
    }

    fn on_failure(&self, inner: &mut Inner, state: State, now: Instant) {
        inner.counts.on_failure();
        match state {
            State::Closed => {
                if (self.settings.ready_to_trip)(&inner.counts) {
                    self.set_state(inner, State::Open, now);
                }
            }
            State::HalfOpen => self.set_state(inner, State::Open, now),
            State::Open => {}
        }
    }

    fn current_state(&self, inner: &mut Inner, now: Instant) -> State {
        match inner.state {
            State::Closed => {
                if inner.expiry.is_some_and(|expiry| expiry <= now) {
                    tracing::debug!(
                        breaker = %self.settings.name,
                        requests = inner.counts.requests,
                        failures = inner.counts.total_failures,
                        "Flush interval elapsed, resetting counts"
                    );
                    self.new_generation(inner, now);
                }
            }
            State::Open => {
                if inner.expiry.is_some_and(|expiry| expiry <= now) {
                    self.set_state(inner, State::HalfOpen, now);
                }
            }
            State::HalfOpen => {}
        }
        inner.state
    }

    fn set_state(&self, inner: &mut Inner, to: State, now: Instant) {
        if inner.state == to {
            return;
        }

        let from = inner.state;
        inner.state = to;
        self.new_generation(inner, now);

        if to == State::Open {
            tracing::warn!(
                breaker = %self.settings.name,
                from = %from,
                generation = %inner.generation,
                timeout_ms = self.settings.timeout.as_millis() as u64,
                "Circuit opened"
            );
        } else {
            tracing::info!(
                breaker = %self.settings.name,
                from = %from,
                to = %to,
                generation = %inner.generation,
                "Circuit state changed"
            );
        }

        if self.settings.metrics {
            metrics::record_state_change(&self.settings.name, from, to);
        }

        if !self.settings.listeners.is_empty() {
            let change = StateChange {
                name: self.settings.name.clone(),
                from,
                to,
                generation: inner.generation,
            };
            for listener in &self.settings.listeners {
                listener(&change);
            }
        }
    }

    fn new_generation(&self, inner: &mut Inner, now: Instant) {
        inner.generation = inner.generation.next();
        inner.counts.clear();
        inner.expiry = match inner.state {
            State::Closed => closed_expiry(&self.settings, now),
            State::Open => now
                .checked_add(self.settings.timeout)
                .or_else(|| now.checked_add(FAR_FUTURE)),
            State::HalfOpen => None,
        };
    }

    fn reject(&self, reason: &'static str) {
        tracing::debug!(breaker = %self.settings.name, reason, "Call rejected");
        if self.settings.metrics {
            metrics::record_rejection(&self.settings.name, reason);
        }
    }

    // Every critical section leaves `Inner` consistent before anything that
    // can panic (user predicates, listeners) runs, so a poisoned lock is safe
    // to reuse.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Next flush point while closed. A zero or unrepresentable interval never flushes.
fn closed_expiry(settings: &Settings, now: Instant) -> Option<Instant> {
    if settings.interval.is_zero() {
        None
    } else {
        now.checked_add(settings.interval)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("settings", &self.settings)
            .field("inner", &*self.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tokio::time;
    use crate::resilience::settings::TripPolicy;

    fn ratio_settings() -> Settings {
        Settings::new("test")
            .with_max_requests(3)
            .with_timeout(Duration::from_millis(70))
            .with_trip_policy(TripPolicy::FailureRatio { min_requests: 3, ratio: 0.6 })
    }

    fn call(cb: &CircuitBreaker, success: bool) {
        let generation = cb.before_call().unwrap();
        cb.after_call(generation, success);
    }

    #[test]
    fn test_initial_state() {
        let cb = CircuitBreaker::new(Settings::new("test"));
        assert_eq!(cb.state(), State::Closed);
        assert_eq!(cb.generation(), Generation(0));
        assert_eq!(cb.counts(), Counts::default());
    }

    #[test]
    fn test_counts_invariant_holds() {
        let cb = CircuitBreaker::new(Settings::new("test").with_trip_policy(
            TripPolicy::ConsecutiveFailures { threshold: u32::MAX },
        ));
        for i in 0..20 {
            call(&cb, i % 3 != 0);
            let counts = cb.counts();
            assert_eq!(counts.requests, counts.total_successes + counts.total_failures);
            assert!(counts.consecutive_successes == 0 || counts.consecutive_failures == 0);
        }
    }

    #[test]
    fn test_two_of_three_failures_trips() {
        let cb = CircuitBreaker::new(ratio_settings());
        call(&cb, false);
        call(&cb, true);
        assert_eq!(cb.state(), State::Closed);
        call(&cb, false);
        assert_eq!(cb.state(), State::Open);
        assert_eq!(cb.counts(), Counts::default());
    }

    #[test]
    fn test_one_of_three_failures_does_not_trip() {
        let cb = CircuitBreaker::new(ratio_settings());
        call(&cb, true);
        call(&cb, false);
        call(&cb, true);
        assert_eq!(cb.state(), State::Closed);
        assert_eq!(cb.counts().requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_until_timeout() {
        let cb = CircuitBreaker::new(ratio_settings());
        for _ in 0..3 {
            call(&cb, false);
        }
        assert!(matches!(cb.before_call(), Err(BreakerError::Open { .. })));
        assert_eq!(cb.snapshot().open_remaining, Some(Duration::from_millis(70)));

        time::advance(Duration::from_millis(69)).await;
        assert!(matches!(cb.before_call(), Err(BreakerError::Open { .. })));

        time::advance(Duration::from_millis(1)).await;
        assert!(cb.before_call().is_ok());
        assert_eq!(cb.state(), State::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_caps_trial_calls() {
        let cb = CircuitBreaker::new(ratio_settings().with_timeout(Duration::from_millis(10)));
        for _ in 0..3 {
            call(&cb, false);
        }
        time::advance(Duration::from_millis(10)).await;

        let admitted: Vec<_> = (0..3).map(|_| cb.before_call().unwrap()).collect();
        assert!(matches!(
            cb.before_call(),
            Err(BreakerError::TooManyRequests { .. })
        ));

        for generation in admitted {
            cb.after_call(generation, true);
        }
        assert_eq!(cb.state(), State::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new(ratio_settings().with_timeout(Duration::from_millis(10)));
        for _ in 0..3 {
            call(&cb, false);
        }
        time::advance(Duration::from_millis(10)).await;

        call(&cb, true);
        call(&cb, true);
        assert_eq!(cb.state(), State::HalfOpen);
        call(&cb, false);
        assert_eq!(cb.state(), State::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_interval_resets_counts_without_notification() {
        let transitions = Arc::new(AtomicUsize::new(0));
        let seen = transitions.clone();
        let cb = CircuitBreaker::new(
            Settings::new("test")
                .with_interval(Duration::from_millis(20))
                .with_listener(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
        );

        call(&cb, false);
        call(&cb, true);
        assert_eq!(cb.counts().requests, 2);

        time::advance(Duration::from_millis(19)).await;
        assert_eq!(cb.counts().requests, 2);

        time::advance(Duration::from_millis(1)).await;

        assert_eq!(cb.counts(), Counts::default());
        assert_eq!(cb.state(), State::Closed);
        assert_eq!(cb.generation(), Generation(1));
        assert_eq!(transitions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_generation_discarded() {
        let cb = CircuitBreaker::new(
            Settings::new("test")
                .with_trip_policy(TripPolicy::ConsecutiveFailures { threshold: 1 }),
        );

        let slow = cb.before_call().unwrap();
        call(&cb, false);
        assert_eq!(cb.state(), State::Open);

        let before = cb.snapshot();
        cb.after_call(slow, false);
        cb.after_call(slow, true);
        let after = cb.snapshot();

        assert_eq!(before.generation, after.generation);
        assert_eq!(before.counts, after.counts);
        assert_eq!(after.state, State::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_sees_transitions() {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let cb = CircuitBreaker::new(
            ratio_settings()
                .with_max_requests(1)
                .with_timeout(Duration::from_millis(10))
                .with_listener(move |change| sink.lock().unwrap().push((change.from, change.to))),
        );

        for _ in 0..3 {
            call(&cb, false);
        }
        time::advance(Duration::from_millis(10)).await;
        call(&cb, true);

        assert_eq!(
            *changes.lock().unwrap(),
            vec![
                (State::Closed, State::Open),
                (State::Open, State::HalfOpen),
                (State::HalfOpen, State::Closed),
            ]
        );
        assert_eq!(cb.generation(), Generation(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_outcome_after_timeout_leaves_state_alone() {
        let transitions = Arc::new(AtomicUsize::new(0));
        let seen = transitions.clone();
        let cb = CircuitBreaker::new(
            Settings::new("test")
                .with_timeout(Duration::from_millis(50))
                .with_trip_policy(TripPolicy::ConsecutiveFailures { threshold: 1 })
                .with_listener(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let slow = cb.before_call().unwrap();
        call(&cb, false);
        let opened = cb.generation();
        assert_eq!(transitions.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_millis(60)).await;
        cb.after_call(slow, false);

        {
            let inner = cb.lock();
            assert_eq!(inner.state, State::Open);
            assert_eq!(inner.generation, opened);
        }
        assert_eq!(transitions.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), State::HalfOpen);
        assert_eq!(transitions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_does_not_overflow() {
        let cb = CircuitBreaker::new(
            Settings::new("test")
                .with_timeout(Duration::MAX)
                .with_trip_policy(TripPolicy::ConsecutiveFailures { threshold: 1 }),
        );
        call(&cb, false);
        assert_eq!(cb.state(), State::Open);

        time::advance(Duration::from_secs(86_400 * 365)).await;
        assert!(matches!(cb.before_call(), Err(BreakerError::Open { .. })));
        assert!(cb.snapshot().open_remaining.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_never_flushes() {
        let cb = CircuitBreaker::new(Settings::new("test").with_interval(Duration::MAX));
        call(&cb, true);
        call(&cb, false);

        time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(cb.counts().requests, 2);
        assert_eq!(cb.generation(), Generation(0));
    }

    #[test]
    fn test_thread_safe_counting() {
        let cb = Arc::new(CircuitBreaker::new(
            Settings::new("test").with_ready_to_trip(|_| false),
        ));

        let mut handles = vec![];
        for t in 0..10 {
            let cb_clone = Arc::clone(&cb);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    call(&cb_clone, (t + i) % 2 == 0);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let counts = cb.counts();
        assert_eq!(counts.requests, 500);
        assert_eq!(counts.total_successes + counts.total_failures, 500);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let cb = Arc::new(CircuitBreaker::new(
            Settings::new("test")
                .with_trip_policy(TripPolicy::ConsecutiveFailures { threshold: 1 })
                .with_listener(|_| panic!("listener bug")),
        ));

        let cb_clone = cb.clone();
        let result = thread::spawn(move || call(&cb_clone, false)).join();
        assert!(result.is_err());

        assert_eq!(cb.state(), State::Open);
    }
}
