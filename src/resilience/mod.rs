//! Resilience patterns for the Candle Source collaborator.
//!
//! This module provides a circuit breaker and a fixed-schedule retry helper
//! for handling Candle Source failures without destabilizing a running
//! session.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};
pub use retry::{RetryError, retry_candle_source_load};
