//! HTTP integration.
//!
//! # Data Flow
//! ```text
//! reqwest::Request (with timeout)
//!     → client.rs GuardedClient::send
//!     → resilience::timeouts (deadline required and enforced)
//!     → CircuitBreaker (admission + outcome)
//!     → reqwest::Client::execute
//! ```
//!
//! # Design Decisions
//! - Only 2xx responses are successes
//! - Requests without a timeout never reach the breaker

pub mod client;

pub use client::{GuardedClient, HttpError};
