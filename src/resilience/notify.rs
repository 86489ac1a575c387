//! State change notifications.
//!
//! # Responsibilities
//! - Describe a transition (`StateChange`)
//! - Provide a non-blocking channel listener for external observers
//!
//! # Design Decisions
//! - Listeners run synchronously while the breaker lock is held, so
//!   notifications from one breaker are delivered in transition order
//! - Listeners must not block and must not call back into the same breaker
//! - The channel listener uses `try_send`; a full channel drops the event

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::resilience::state::{Generation, State};

/// A single state transition of a named breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Name of the breaker that transitioned.
    pub name: String,
    pub from: State,
    pub to: State,
    /// Generation opened by this transition.
    pub generation: Generation,
}

/// Callback invoked on every state transition.
pub type Listener = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Create a listener that forwards transitions into a bounded channel.
pub fn channel_listener(capacity: usize) -> (Listener, mpsc::Receiver<StateChange>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let listener: Listener = Arc::new(move |change: &StateChange| {
        match tx.try_send(change.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(
                    breaker = %dropped.name,
                    from = %dropped.from,
                    to = %dropped.to,
                    "State change channel full, dropping notification"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(breaker = %change.name, "State change receiver gone");
            }
        }
    });

    (listener, rx)
}
