//! Retry with exponential backoff behind a circuit breaker.
//!
//! ```text
//! caller → Retrying::call → CircuitBreaker::call → operation
//! ```

pub mod config;
pub mod http;
pub mod observability;
pub mod resilience;

pub use config::{CircuitBreakerConfig, ResilienceConfig, RetryConfig};
pub use observability::{EventSink, ResilienceEvent};
pub use resilience::{retry, CircuitBreaker, RetryError, Retryable, Retrying};
