//! Tripwire: a concurrency-safe circuit breaker.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller
//!       │
//!       ▼
//!  ┌──────────────────────────────────────────────────────────┐
//!  │ execute / execute_async / allow (resilience::execute,    │
//!  │                                   resilience::permit)    │
//!  │        │ before_call                 ▲ after_call         │
//!  │        ▼                             │                    │
//!  │  ┌───────────────────────────────────┴──────────────┐    │
//!  │  │ CircuitBreaker (one mutex)                        │    │
//!  │  │   state · counts · generation · expiry            │    │
//!  │  └──────────────┬────────────────────────────────────┘    │
//!  │                 │ transitions                             │
//!  │                 ▼                                         │
//!  │   listeners (notify) · tracing · metrics                  │
//!  └──────────────────────────────────────────────────────────┘
//!       │ admitted only
//!       ▼
//!   guarded operation (runs outside the lock)
//! ```
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tripwire::{BreakerError, CircuitBreaker, Settings, TripPolicy};
//!
//! let breaker = CircuitBreaker::new(
//!     Settings::new("users-api")
//!         .with_max_requests(3)
//!         .with_timeout(Duration::from_secs(30))
//!         .with_trip_policy(TripPolicy::FailureRatio { min_requests: 3, ratio: 0.6 }),
//! );
//!
//! let value = breaker.execute(|| Ok::<_, std::io::Error>(42));
//! assert_eq!(value.unwrap(), 42);
//!
//! match breaker.execute(|| Err::<(), _>(std::io::Error::other("down"))) {
//!     Err(BreakerError::Operation(e)) => assert_eq!(e.to_string(), "down"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

// Core
pub mod resilience;

// Integration
pub mod config;
pub mod http;
pub mod registry;

// Cross-cutting concerns
pub mod observability;

pub use config::TripwireConfig;
pub use registry::BreakerRegistry;
pub use resilience::{
    BreakerError, BreakerResult, BreakerSnapshot, CircuitBreaker, Counts, Generation, Permit,
    Settings, State, StateChange, TripPolicy,
};
