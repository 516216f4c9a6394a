//! Per-tool failure isolation.
//!
//! One breaker guards each registered tool. Consecutive failures open it;
//! once the recovery timeout has passed since the last failure the next
//! admission check moves it to half-open, and any success closes it again.

use chrono::{DateTime, Utc};
use common::CircuitBreakerConfigBase;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where a breaker sits in its open/close cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitBreakerState {
    /// Calls flow through normally
    #[default]
    Closed,

    /// Calls are rejected until the recovery timeout elapses
    Open,

    /// Recovery is being probed
    HalfOpen,
}

impl std::fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerState::Closed => write!(f, "closed"),
            CircuitBreakerState::Open => write!(f, "open"),
            CircuitBreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,

    /// Time after the last failure before a call is let through again
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&CircuitBreakerConfigBase> for CircuitBreakerConfig {
    fn from(base: &CircuitBreakerConfigBase) -> Self {
        Self {
            failure_threshold: base.failure_threshold,
            recovery_timeout: base.recovery_timeout(),
        }
    }
}

/// Point-in-time view of a breaker, for health reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitBreakerState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub blocked_requests: u64,
}

#[derive(Debug, Default)]
struct BreakerState {
    state: CircuitBreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
}

/// Circuit breaker shared by all callers of one tool
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    blocked_requests: AtomicU64,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerState::default()),
            blocked_requests: AtomicU64::new(0),
        }
    }

    /// Whether a call may proceed. An open breaker whose recovery timeout has
    /// elapsed moves to half-open here.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitBreakerState::Closed | CircuitBreakerState::HalfOpen => true,
            CircuitBreakerState::Open => {
                let recovered = inner
                    .last_failure
                    .map_or(true, |at| at.elapsed() > self.config.recovery_timeout);
                if recovered {
                    info!(
                        failure_count = inner.failure_count,
                        "Recovery window elapsed, admitting a probe call"
                    );
                    inner.state = CircuitBreakerState::HalfOpen;
                    true
                } else {
                    self.blocked_requests.fetch_add(1, Ordering::Relaxed);
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitBreakerState::Closed {
            info!(previous = %inner.state, "Tool recovered, breaker closed");
        }
        inner.state = CircuitBreakerState::Closed;
        inner.failure_count = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());
        inner.last_failure_at = Some(Utc::now());
        debug!(
            state = %inner.state,
            failure_count = inner.failure_count,
            "Tool failure counted"
        );

        if inner.failure_count >= self.config.failure_threshold
            && inner.state != CircuitBreakerState::Open
        {
            warn!(
                failure_count = inner.failure_count,
                threshold = self.config.failure_threshold,
                "Failure threshold reached, breaker open"
            );
            inner.state = CircuitBreakerState::Open;
        }
    }

    pub fn state(&self) -> CircuitBreakerState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock();
        CircuitBreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_secs: self.config.recovery_timeout.as_secs(),
            last_failure_at: inner.last_failure_at,
            blocked_requests: self.blocked_requests.load(Ordering::Relaxed),
        }
    }
}
