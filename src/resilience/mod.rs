//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Wrapped call:
//!     → retries.rs (attempt loop, backoff.rs schedule)
//!     → circuit_breaker.rs (skip if open, record retryable failures)
//!     → operation
//! ```
//!
//! # Design Decisions
//! - Failure classification belongs to the operation's error type (`Retryable`)
//! - Callers see the success value or exactly one `RetryError`
//! - Events go to an injected sink, never a global logger

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod retries;

pub use circuit_breaker::{CircuitBreaker, CircuitState, Outcome};
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{RetryError, Retryable};
pub use retries::{retry, Retrying};
