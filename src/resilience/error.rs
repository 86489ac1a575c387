//! Breaker error definitions.

use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;

/// Errors returned from a guarded call.
///
/// `E` is the guarded operation's own error type. Admission checks that never
/// run an operation use the default `Infallible`.
#[derive(Debug, Error)]
pub enum BreakerError<E = Infallible> {
    /// The breaker is open and the open timeout has not elapsed.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The half-open trial cap is already in use.
    #[error("circuit breaker '{name}' is half-open and has too many trial requests in flight")]
    TooManyRequests { name: String },

    /// The call was submitted without a deadline.
    #[error("guarded calls must carry a deadline")]
    MissingDeadline,

    /// The call outlived its deadline. Recorded as a failure.
    #[error("guarded call exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The operation's own error, passed through unchanged.
    #[error(transparent)]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// True for errors raised by admission control (the operation never ran).
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            BreakerError::Open { .. } | BreakerError::TooManyRequests { .. }
        )
    }

    /// Returns the operation's error, if that is what this is.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl BreakerError<Infallible> {
    /// Re-type an admission error for a specific operation error type.
    pub fn widen<E>(self) -> BreakerError<E> {
        match self {
            BreakerError::Open { name } => BreakerError::Open { name },
            BreakerError::TooManyRequests { name } => BreakerError::TooManyRequests { name },
            BreakerError::MissingDeadline => BreakerError::MissingDeadline,
            BreakerError::DeadlineExceeded(d) => BreakerError::DeadlineExceeded(d),
            BreakerError::Operation(never) => match never {},
        }
    }
}

/// Result type for guarded calls.
pub type BreakerResult<T, E = Infallible> = Result<T, BreakerError<E>>;
