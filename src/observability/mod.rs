//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! retry controller / circuit breaker
//!     → events.rs (ResilienceEvent into an injected EventSink)
//!     → TracingSink: tracing events + metrics.rs counters
//!
//! Binary startup:
//!     → logging.rs (tracing-subscriber on stderr, env filter, optional JSON)
//! ```
//!
//! # Design Decisions
//! - Library code never installs a subscriber; only the binary does
//! - Levels: info for retries, warn for rejected calls, error for failures

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventSink, MemorySink, ResilienceEvent, TracingSink};
