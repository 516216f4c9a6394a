//! Retry backoff.
//!
//! The registry drives its own retry loop; this module only answers how long
//! to wait before a given attempt.

use common::RetryConfigBase;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategies for retry delays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed { delay: Duration },

    /// Exponential backoff: initial_delay * base^attempt, capped at max_delay
    Exponential {
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    },
}

impl Default for BackoffStrategy {
    /// 1s, 2s, 4s, ...
    fn default() -> Self {
        Self::Exponential {
            initial_delay: Duration::from_secs(1),
            base: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&RetryConfigBase> for BackoffStrategy {
    fn from(config: &RetryConfigBase) -> Self {
        Self::Exponential {
            initial_delay: Duration::from_millis(config.initial_backoff_ms),
            base: config.backoff_multiplier,
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Exponential {
                initial_delay,
                base,
                max_delay,
            } => {
                let millis = initial_delay.as_millis() as f64 * base.powi(attempt as i32);
                if !millis.is_finite() || millis >= max_delay.as_millis() as f64 {
                    *max_delay
                } else {
                    Duration::from_millis(millis as u64)
                }
            }
        }
    }
}
