//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breaker transitions, rejections and outcomes produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → Whatever subscriber / recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - The library only emits; exporters belong to the host
//! - Breaker name is a field on every event and a label on every metric
//! - Metrics are cheap (atomic increments) and can be disabled per breaker

pub mod logging;
pub mod metrics;
