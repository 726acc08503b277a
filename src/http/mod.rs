//! HTTP fetch collaborator.
//!
//! The resilience layer is transport-agnostic; this module supplies the
//! concrete operation the binary wraps, together with its failure
//! classification.

pub mod client;

pub use client::{FetchError, HttpFetcher};
