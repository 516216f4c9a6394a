use std::time::Duration;
use thiserror::Error;

use super::ToolStatus;

/// Why a single attempt to run a tool failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Tool timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error(transparent)]
    Tool(Box<dyn std::error::Error + Send + Sync>),

    /// The tool rejected its arguments
    #[error(transparent)]
    InvalidInput(Box<dyn std::error::Error + Send + Sync>),
}

impl AttemptError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Invalid input is neither retried nor counted against the breaker
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidInput(_))
    }
}

/// Tool registry errors. Everything except `ExecutionFailed` is a gating
/// error raised before any attempt is made.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool {tool} is {status}")]
    ToolUnavailable { tool: String, status: ToolStatus },

    #[error("Circuit breaker open for tool {tool}")]
    CircuitOpen { tool: String },

    #[error("Tool {tool} depends on unavailable tool {dependency}")]
    DependencyUnavailable { tool: String, dependency: String },

    #[error("Failed to instantiate tool {tool}: {reason}")]
    InstantiationFailed { tool: String, reason: String },

    #[error("Tool {tool} failed after {attempts} attempt(s): {source}")]
    ExecutionFailed {
        tool: String,
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

impl RegistryError {
    /// Gating errors mean the call was never attempted
    pub fn is_gating(&self) -> bool {
        !matches!(self, Self::ExecutionFailed { .. })
    }
}
