//! Error types surfaced by the resilience layer.

use thiserror::Error;

/// Classification of an operation's failures.
///
/// Implemented by the error type of whatever operation is being wrapped. A
/// retryable failure is counted by the circuit breaker and retried; anything
/// else fails fast.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Terminal error of a retried call.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The operation failed in a way retrying cannot fix.
    #[error("non-retryable failure: {0}")]
    NonRetryable(#[source] E),

    /// Every attempt was used without a success.
    #[error("retries exhausted after {attempts} attempts ({circuit_open_skips} skipped by open circuit)")]
    Exhausted {
        attempts: u32,
        circuit_open_skips: u32,
        /// Last retryable failure observed; `None` if the circuit rejected
        /// every attempt.
        #[source]
        last_failure: Option<E>,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The underlying operation error, if one was observed.
    pub fn failure(&self) -> Option<&E> {
        match self {
            RetryError::NonRetryable(err) => Some(err),
            RetryError::Exhausted { last_failure, .. } => last_failure.as_ref(),
        }
    }

    pub fn into_failure(self) -> Option<E> {
        match self {
            RetryError::NonRetryable(err) => Some(err),
            RetryError::Exhausted { last_failure, .. } => last_failure,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}
