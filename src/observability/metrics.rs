//! Resilience counters.
//!
//! # Metrics
//! - `auto_retry_attempts_total` (counter): attempts that reached the operation
//! - `auto_retry_failures_total` (counter): retryable operation failures
//! - `auto_retry_retries_total` (counter): scheduled retries
//! - `auto_retry_circuit_rejections_total` (counter): attempts skipped by an open circuit
//! - `auto_retry_circuit_opened_total` (counter): Closed → Open transitions
//! - `auto_retry_exhausted_total` (counter): calls that ran out of attempts
//!
//! Without an installed recorder these are no-ops.

use metrics::counter;

pub fn record_attempt(operation: &str) {
    counter!("auto_retry_attempts_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_failure(operation: &str) {
    counter!("auto_retry_failures_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_retry(operation: &str) {
    counter!("auto_retry_retries_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_circuit_rejection(operation: &str) {
    counter!("auto_retry_circuit_rejections_total", "operation" => operation.to_string())
        .increment(1);
}

pub fn record_circuit_opened(operation: &str) {
    counter!("auto_retry_circuit_opened_total", "operation" => operation.to_string())
        .increment(1);
}

pub fn record_exhausted(operation: &str) {
    counter!("auto_retry_exhausted_total", "operation" => operation.to_string()).increment(1);
}
