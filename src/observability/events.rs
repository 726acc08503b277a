//! Resilience events and the sinks that consume them.
//!
//! The retry controller and circuit breaker never log directly. They emit a
//! [`ResilienceEvent`] into an [`EventSink`] owned by the wrapper, so logging
//! configuration stays with the caller instead of in process-wide state.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::observability::metrics;

/// Something worth observing happened inside a wrapped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResilienceEvent {
    /// The breaker let an attempt through and the operation is being invoked.
    AttemptStarted,
    /// An attempt failed and another one is scheduled.
    RetryScheduled { next_attempt: u32, delay: Duration },
    /// The breaker rejected an attempt without calling the operation.
    CircuitRejected { failure_count: u32 },
    /// The operation failed with a retryable error and the failure was recorded.
    OperationFailed { failure_count: u32, error: String },
    /// The failure count reached the threshold.
    CircuitOpened { failure_count: u32 },
    /// The recovery timeout elapsed and the breaker closed again.
    CircuitRecovered,
    /// All attempts were used without a success.
    RetriesExhausted { attempts: u32 },
}

/// Consumer of resilience events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ResilienceEvent);
}

/// Default sink: structured `tracing` events plus `metrics` counters.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    operation: Option<String>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label events with the name of the protected operation.
    pub fn named(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
        }
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &ResilienceEvent) {
        let operation = self.operation.as_deref().unwrap_or("unnamed");
        match event {
            ResilienceEvent::AttemptStarted => {
                tracing::debug!(operation, "Invoking operation");
                metrics::record_attempt(operation);
            }
            ResilienceEvent::RetryScheduled { next_attempt, delay } => {
                tracing::info!(operation, next_attempt, delay = ?delay, "Retrying... attempt {}", next_attempt);
                metrics::record_retry(operation);
            }
            ResilienceEvent::CircuitRejected { failure_count } => {
                tracing::warn!(operation, failure_count, "Circuit breaker is open, skipping call");
                metrics::record_circuit_rejection(operation);
            }
            ResilienceEvent::OperationFailed { failure_count, error } => {
                tracing::error!(operation, failure_count, error = %error, "Request failed");
                metrics::record_failure(operation);
            }
            ResilienceEvent::CircuitOpened { failure_count } => {
                tracing::warn!(operation, failure_count, "Circuit breaker opened");
                metrics::record_circuit_opened(operation);
            }
            ResilienceEvent::CircuitRecovered => {
                tracing::info!(operation, "Circuit breaker recovery timeout elapsed, closing");
            }
            ResilienceEvent::RetriesExhausted { attempts } => {
                tracing::error!(operation, attempts, "Max attempts reached");
                metrics::record_exhausted(operation);
            }
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ResilienceEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far, oldest first.
    pub fn events(&self) -> Vec<ResilienceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, pred: impl Fn(&ResilienceEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| pred(e))
            .count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &ResilienceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
