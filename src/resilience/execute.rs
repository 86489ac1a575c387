//! Execution wrapper.
//!
//! # Data Flow
//! ```text
//! execute(op)
//!     → allow() (admission; rejected calls never run op)
//!     → op() outside the lock, panics caught
//!     → classify (Ok = success, Err via is_successful, panic = failure)
//!     → permit.record(success)
//!     → return op's result unchanged (or resume the panic)
//! ```

use std::error::Error as StdError;
use std::future::Future;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::BreakerError;

impl CircuitBreaker {
    /// Run `op` if the breaker admits it and record its outcome.
    pub fn execute<T, E, F>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: StdError + 'static,
    {
        self.execute_classified(op, |result| self.classify(result))
    }

    /// Like [`execute`](Self::execute), with a per-call success classifier.
    pub fn execute_classified<T, E, F, C>(&self, op: F, classify: C) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        C: FnOnce(&Result<T, E>) -> bool,
    {
        let permit = self.allow().map_err(BreakerError::widen)?;
        permit.run(op, classify).map_err(BreakerError::Operation)
    }

    /// Await `fut` if the breaker admits it and record its outcome.
    ///
    /// A rejected future is dropped without being polled. Dropping the
    /// returned future mid-flight abandons the call.
    pub async fn execute_async<T, E, Fut>(&self, fut: Fut) -> Result<T, BreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        E: StdError + 'static,
    {
        self.execute_async_classified(fut, |result| self.classify(result))
            .await
    }

    pub async fn execute_async_classified<T, E, Fut, C>(
        &self,
        fut: Fut,
        classify: C,
    ) -> Result<T, BreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&Result<T, E>) -> bool,
    {
        let permit = self.allow().map_err(BreakerError::widen)?;
        permit
            .guard(fut, classify)
            .await
            .map_err(BreakerError::Operation)
    }

    /// Default classification: `Ok` succeeds, `Err` asks the success predicate.
    pub(crate) fn classify<T, E>(&self, result: &Result<T, E>) -> bool
    where
        E: StdError + 'static,
    {
        match result {
            Ok(_) => true,
            Err(e) => (self.settings().is_successful)(e),
        }
    }
}
