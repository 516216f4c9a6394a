use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ToolStatus;
use crate::reliability::CircuitBreakerState;

/// Last known health of a registered tool
#[derive(Debug, Clone)]
pub(crate) struct HealthRecord {
    pub healthy: bool,
    pub detail: String,
    pub last_checked: DateTime<Utc>,
}

impl HealthRecord {
    pub fn new(healthy: bool, detail: impl Into<String>) -> Self {
        Self {
            healthy,
            detail: detail.into(),
            last_checked: Utc::now(),
        }
    }
}

/// Health report entry returned by `ToolRegistry::health_check`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolHealthReport {
    /// `None` when the requested tool is not registered
    pub status: Option<ToolStatus>,
    pub healthy: bool,
    pub detail: String,
    pub circuit_breaker_state: Option<CircuitBreakerState>,
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub rate_limited: bool,
    pub last_checked: DateTime<Utc>,
}

impl ToolHealthReport {
    pub(crate) fn unknown(name: &str) -> Self {
        Self {
            status: None,
            healthy: false,
            detail: format!("Tool not found: {}", name),
            circuit_breaker_state: None,
            failure_count: 0,
            last_failure_at: None,
            rate_limited: false,
            last_checked: Utc::now(),
        }
    }
}
