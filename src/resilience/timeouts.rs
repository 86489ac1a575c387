//! Deadline enforcement layered on top of the breaker.
//!
//! # Responsibilities
//! - Refuse guarded calls that carry no deadline
//! - Wrap admitted calls with a timeout
//! - Record an elapsed deadline as a failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A missing deadline is a configuration error raised before admission;
//!   it never touches breaker state
//! - Timeout errors are distinct from operation errors

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::BreakerError;

/// Run `fut` through `breaker`, requiring and enforcing a deadline.
pub async fn execute_with_deadline<T, E, Fut>(
    breaker: &CircuitBreaker,
    deadline: Option<Duration>,
    fut: Fut,
) -> Result<T, BreakerError<E>>
where
    Fut: Future<Output = Result<T, E>>,
    E: StdError + 'static,
{
    let Some(deadline) = deadline else {
        tracing::warn!(breaker = %breaker.name(), "Rejecting guarded call without a deadline");
        return Err(BreakerError::MissingDeadline);
    };

    let permit = breaker.allow().map_err(BreakerError::widen)?;

    let outcome = permit
        .guard(time::timeout(deadline, fut), |outcome| match outcome {
            Ok(result) => breaker.classify(result),
            Err(_elapsed) => false,
        })
        .await;

    match outcome {
        Ok(result) => result.map_err(BreakerError::Operation),
        Err(_elapsed) => {
            tracing::debug!(
                breaker = %breaker.name(),
                deadline_ms = deadline.as_millis() as u64,
                "Guarded call exceeded its deadline"
            );
            Err(BreakerError::DeadlineExceeded(deadline))
        }
    }
}
