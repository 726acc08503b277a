//! Circuit breaker guarding a single protected operation.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: operation assumed unhealthy, calls are skipped
//!
//! # State Transitions
//! ```text
//! Closed → Open:   failure_count >= failure_threshold after a recorded failure
//! Open → Closed:   checked lazily on is_open(); elapsed since last failure > recovery_timeout
//! Closed → Closed: any success resets failure_count
//! ```
//!
//! # Design Decisions
//! - No background timer; the cooldown is only evaluated when the breaker is consulted
//! - Only retryable failures are recorded; logic errors pass through untouched
//! - Counters live behind a mutex that is never held across an `.await`

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::{EventSink, ResilienceEvent, TracingSink};
use crate::resilience::clock::{Clock, TokioClock};
use crate::resilience::error::Retryable;

/// Circuit state as reported by [`CircuitBreaker::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

/// Result of one guarded attempt.
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// The operation succeeded; the breaker was reset.
    Success(T),
    /// The operation failed with a retryable error; the failure was recorded.
    TransientFailure(E),
    /// The breaker was open and the operation was not invoked.
    CircuitOpen,
}

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Consecutive-failure circuit breaker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl CircuitBreaker {
    /// Create a closed breaker. A `failure_threshold` of 0 is raised to 1.
    pub fn new(mut config: CircuitBreakerConfig) -> Self {
        config.failure_threshold = config.failure_threshold.max(1);
        Self {
            config,
            state: Mutex::new(BreakerState::default()),
            clock: Arc::new(TokioClock),
            events: Arc::new(TracingSink::new()),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the event sink.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `operation` unless the circuit is open.
    ///
    /// Retryable failures are recorded and handed back as
    /// [`Outcome::TransientFailure`]. Non-retryable failures are returned as
    /// `Err` without touching the failure count.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<Outcome<T, E>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        if self.is_open() {
            let failure_count = self.failure_count();
            self.events
                .emit(&ResilienceEvent::CircuitRejected { failure_count });
            return Ok(Outcome::CircuitOpen);
        }

        self.events.emit(&ResilienceEvent::AttemptStarted);
        match operation().await {
            Ok(value) => {
                self.reset();
                Ok(Outcome::Success(value))
            }
            Err(err) if err.is_retryable() => {
                let failure_count = self.record_failure();
                self.events.emit(&ResilienceEvent::OperationFailed {
                    failure_count,
                    error: err.to_string(),
                });
                Ok(Outcome::TransientFailure(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Whether calls are currently being rejected.
    ///
    /// Closes the circuit as a side effect once the recovery timeout has
    /// elapsed since the last failure.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();
        if state.failure_count < self.config.failure_threshold {
            return false;
        }

        let Some(last_failure) = state.last_failure else {
            return false;
        };
        let elapsed = self.clock.now().saturating_duration_since(last_failure);
        if elapsed <= self.config.recovery_timeout() {
            return true;
        }

        *state = BreakerState::default();
        drop(state);
        self.events.emit(&ResilienceEvent::CircuitRecovered);
        false
    }

    /// Count a failure and stamp the current time. Returns the new count.
    pub fn record_failure(&self) -> u32 {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure = Some(self.clock.now());
        let failure_count = state.failure_count;
        drop(state);

        if failure_count == self.config.failure_threshold {
            self.events
                .emit(&ResilienceEvent::CircuitOpened { failure_count });
        }
        failure_count
    }

    /// Return to the initial closed state.
    pub fn reset(&self) {
        *self.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Current state, applying the lazy recovery check.
    pub fn state(&self) -> CircuitState {
        if self.is_open() {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("failure_count", &state.failure_count)
            .field("last_failure", &state.last_failure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use crate::resilience::clock::ManualClock;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("network unreachable")]
        Network,
        #[error("bad input")]
        Logic,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Network)
        }
    }

    fn breaker(threshold: u32, recovery_secs: u64) -> (CircuitBreaker, ManualClock, MemorySink) {
        let clock = ManualClock::new();
        let sink = MemorySink::new();
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout_secs: recovery_secs,
        })
        .with_clock(Arc::new(clock.clone()))
        .with_event_sink(Arc::new(sink.clone()));
        (breaker, clock, sink)
    }

    #[test]
    fn test_opens_exactly_at_threshold() {
        for threshold in 1..=5 {
            let (cb, _, _) = breaker(threshold, 5);
            for _ in 1..threshold {
                cb.record_failure();
                assert!(!cb.is_open(), "opened before failure #{}", threshold);
            }
            cb.record_failure();
            assert!(cb.is_open());
            assert_eq!(cb.state(), CircuitState::Open);
        }
    }

    #[test]
    fn test_recovers_after_timeout() {
        let (cb, clock, sink) = breaker(2, 1);
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_open());

        clock.advance(Duration::from_secs(1));
        assert!(cb.is_open(), "timeout must be strictly exceeded");

        clock.advance(Duration::from_millis(500));
        assert!(!cb.is_open());
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(sink.count(|e| *e == ResilienceEvent::CircuitRecovered), 1);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let (cb, _, _) = breaker(3, 5);
        cb.record_failure();
        cb.record_failure();

        let outcome = cb.call(|| async { Ok::<_, TestError>(7) }).await;

        assert!(matches!(outcome, Ok(Outcome::Success(7))));
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_recorded_and_returned() {
        let (cb, _, sink) = breaker(3, 5);

        let outcome = cb
            .call(|| async { Err::<(), _>(TestError::Network) })
            .await;

        assert!(matches!(outcome, Ok(Outcome::TransientFailure(TestError::Network))));
        assert_eq!(cb.failure_count(), 1);
        assert_eq!(
            sink.events(),
            vec![
                ResilienceEvent::AttemptStarted,
                ResilienceEvent::OperationFailed {
                    failure_count: 1,
                    error: "network unreachable".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_non_retryable_failure_is_not_recorded() {
        let (cb, _, sink) = breaker(1, 5);

        let outcome = cb.call(|| async { Err::<(), _>(TestError::Logic) }).await;

        assert!(matches!(outcome, Err(TestError::Logic)));
        assert_eq!(cb.failure_count(), 0);
        assert!(!cb.is_open());
        assert_eq!(sink.events(), vec![ResilienceEvent::AttemptStarted]);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_operation() {
        let (cb, _, sink) = breaker(1, 5);
        cb.record_failure();

        let mut invoked = false;
        let outcome = cb
            .call(|| {
                invoked = true;
                async { Ok::<_, TestError>(()) }
            })
            .await;

        assert!(matches!(outcome, Ok(Outcome::CircuitOpen)));
        assert!(!invoked);
        assert_eq!(sink.count(|e| *e == ResilienceEvent::AttemptStarted), 0);
        assert_eq!(
            sink.count(|e| matches!(e, ResilienceEvent::CircuitRejected { failure_count: 1 })),
            1
        );
    }

    #[test]
    fn test_opened_event_emitted_once() {
        let (cb, _, sink) = breaker(2, 5);
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();

        assert_eq!(
            sink.count(|e| matches!(e, ResilienceEvent::CircuitOpened { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_zero_threshold_behaves_like_one() {
        let (cb, _, sink) = breaker(0, 5);
        assert_eq!(cb.config().failure_threshold, 1);

        for _ in 0..3 {
            let outcome = cb.call(|| async { Ok::<_, TestError>(()) }).await;
            assert!(matches!(outcome, Ok(Outcome::Success(()))));
            assert!(!cb.is_open());
        }
        assert_eq!(sink.count(|e| *e == ResilienceEvent::CircuitRecovered), 0);

        cb.record_failure();
        assert!(cb.is_open());
    }

    #[test]
    fn test_closed_breaker_without_failures_emits_nothing() {
        let (cb, clock, sink) = breaker(1, 1);
        clock.advance(Duration::from_secs(10));

        assert!(!cb.is_open());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(sink.events().is_empty());
    }
}
