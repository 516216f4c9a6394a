//! Tool Reliability Module
//!
//! Circuit breaking, retry backoff and advisory rate tracking used by the
//! tool registry.

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry_policy;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitBreakerState,
};
pub use rate_limiter::RateWindow;
pub use retry_policy::BackoffStrategy;
