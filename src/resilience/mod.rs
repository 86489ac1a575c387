//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded call:
//!     → timeouts.rs (optional: require and enforce a deadline)
//!     → execute.rs (admission, run operation, record outcome)
//!     → permit.rs (generation captured at admission)
//!     → circuit_breaker.rs (counts, trip policy, state transitions)
//!     → notify.rs (listeners observe transitions)
//! ```
//!
//! # Design Decisions
//! - The breaker never retries and never backs off
//! - Failures are a boolean classification supplied by the caller
//! - All bookkeeping is serialized; guarded work is not

pub mod circuit_breaker;
pub mod error;
pub mod execute;
pub mod notify;
pub mod permit;
pub mod settings;
pub mod state;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker};
pub use error::{BreakerError, BreakerResult};
pub use notify::{channel_listener, Listener, StateChange};
pub use permit::Permit;
pub use settings::{Settings, TripPolicy};
pub use state::{Counts, Generation, State};
