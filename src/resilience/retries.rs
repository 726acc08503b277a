//! Retry controller.
//!
//! # Responsibilities
//! - Drive up to `max_attempts` invocations through the circuit breaker
//! - Wait with exponential backoff between attempts
//! - Surface either the first success or exactly one terminal error
//!
//! # Design Decisions
//! - Non-retryable failures fail fast, bypassing both the loop and the breaker
//! - A skip by an open circuit consumes an attempt and backs off like a failure
//! - No wait after the final attempt; nothing follows it
//! - One breaker per wrapper, shared by every call made through it

use std::future::Future;
use std::sync::Arc;

use crate::config::{CircuitBreakerConfig, RetryConfig};
use crate::observability::{EventSink, ResilienceEvent, TracingSink};
use crate::resilience::backoff::Backoff;
use crate::resilience::circuit_breaker::{CircuitBreaker, Outcome};
use crate::resilience::error::{RetryError, Retryable};

/// Wrap `operation` with retries and a fresh circuit breaker.
///
/// ```no_run
/// # use auto_retry::{retry, RetryConfig, Retryable};
/// # #[derive(Debug, thiserror::Error)]
/// # #[error("io")]
/// # struct IoError;
/// # impl Retryable for IoError { fn is_retryable(&self) -> bool { true } }
/// # async fn example() {
/// let double = retry(RetryConfig::default(), |n: u32| async move { Ok::<_, IoError>(n * 2) });
/// assert_eq!(double.call(21).await.unwrap(), 42);
/// # }
/// ```
pub fn retry<F>(config: RetryConfig, operation: F) -> Retrying<F> {
    Retrying::new(config, operation)
}

/// An operation guarded by retries and a circuit breaker.
///
/// Calling it has the same argument and success types as the wrapped
/// operation. Arguments are cloned for each attempt.
pub struct Retrying<F> {
    operation: F,
    config: RetryConfig,
    breaker: CircuitBreaker,
    events: Arc<dyn EventSink>,
}

impl<F> Retrying<F> {
    /// Wrap `operation`. A `max_attempts` of 0 is raised to 1.
    pub fn new(mut config: RetryConfig, operation: F) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        let events: Arc<dyn EventSink> = Arc::new(TracingSink::new());
        Self {
            operation,
            config,
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default())
                .with_event_sink(events.clone()),
            events,
        }
    }

    /// Replace the circuit breaker. Its events go to this wrapper's sink.
    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker.with_event_sink(self.events.clone());
        self
    }

    /// Route events from both the controller and its breaker to `events`.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.breaker = self.breaker.with_event_sink(events.clone());
        self.events = events;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Invoke the wrapped operation with retries.
    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, RetryError<E>>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error + 'static,
    {
        let max_attempts = self.config.max_attempts;
        let mut backoff = Backoff::new(self.config.initial_delay());
        let mut attempts = 0;
        let mut circuit_open_skips = 0;
        let mut last_failure = None;

        while attempts < max_attempts {
            let attempt_args = args.clone();
            match self.breaker.call(|| (self.operation)(attempt_args)).await {
                Ok(Outcome::Success(value)) => return Ok(value),
                Ok(Outcome::TransientFailure(err)) => last_failure = Some(err),
                Ok(Outcome::CircuitOpen) => circuit_open_skips += 1,
                Err(err) => return Err(RetryError::NonRetryable(err)),
            }

            attempts += 1;
            if attempts < max_attempts {
                if let Some(delay) = backoff.next() {
                    self.events.emit(&ResilienceEvent::RetryScheduled {
                        next_attempt: attempts + 1,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.events
            .emit(&ResilienceEvent::RetriesExhausted { attempts });
        Err(RetryError::Exhausted {
            attempts,
            circuit_open_skips,
            last_failure,
        })
    }
}

impl<F> std::fmt::Debug for Retrying<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrying")
            .field("config", &self.config)
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}
