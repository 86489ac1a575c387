//! Breaker-guarded HTTP client.
//!
//! # Responsibilities
//! - Require an explicit timeout on every request
//! - Run requests through the breaker
//! - Classify transport errors and non-2xx responses as failures
//!
//! # Design Decisions
//! - The request's own timeout doubles as the breaker deadline
//! - Failed responses are returned as errors; their bodies are dropped

use std::sync::Arc;
use std::time::Duration;
use reqwest::{Client, Method, Request, Response, StatusCode};
use thiserror::Error;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::BreakerError;
use crate::resilience::timeouts::execute_with_deadline;

/// Failure of a guarded HTTP call.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection, TLS or protocol error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// HTTP client whose calls pass through a circuit breaker.
#[derive(Debug, Clone)]
pub struct GuardedClient {
    client: Client,
    breaker: Arc<CircuitBreaker>,
}

impl GuardedClient {
    pub fn new(client: Client, breaker: Arc<CircuitBreaker>) -> Self {
        Self { client, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Send a prepared request. The request must carry a timeout.
    pub async fn send(&self, request: Request) -> Result<Response, BreakerError<HttpError>> {
        let deadline = request.timeout().copied();
        let method = request.method().clone();
        let url = request.url().clone();

        let call = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(HttpError::Status(status));
            }
            Ok::<Response, HttpError>(response)
        };
        let result = execute_with_deadline(&self.breaker, deadline, call).await;

        if let Err(e) = &result {
            tracing::debug!(
                breaker = %self.breaker.name(),
                method = %method,
                url = %url,
                error = %e,
                "Guarded request failed"
            );
        }
        result
    }

    /// GET `url` with the given timeout.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<Response, BreakerError<HttpError>> {
        let request = self
            .client
            .request(Method::GET, url)
            .timeout(timeout)
            .build()
            .map_err(|e| BreakerError::Operation(HttpError::Transport(e)))?;
        self.send(request).await
    }
}
