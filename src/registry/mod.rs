//! Breaker registry subsystem.
//!
//! # Data Flow
//! ```text
//! TripwireConfig.breakers
//!     → manager.rs (one Arc<CircuitBreaker> per name)
//!     → callers fetch handles by dependency name
//!     → snapshot() for status reporting
//! ```
//!
//! # Design Decisions
//! - Optional: breakers work without a registry
//! - One breaker per guarded dependency, no sharding
//! - Registry is cheap to clone; clones share the same map

pub mod manager;

pub use manager::BreakerRegistry;
