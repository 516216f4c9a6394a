use thiserror::Error;

use crate::fda::FdaError;

/// Errors raised by tool implementations
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("FDA data source error: {0}")]
    Source(#[from] FdaError),
}

impl ToolError {
    /// Caller mistakes; repeating the call cannot succeed
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::MissingArgument(_) | Self::InvalidArgument { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_argument_errors_are_invalid_input() {
        assert!(ToolError::MissingArgument("intended_use".to_string()).is_invalid_input());
        assert!(ToolError::InvalidArgument {
            name: "max_results".to_string(),
            reason: "must be at least 1".to_string(),
        }
        .is_invalid_input());
        assert!(!ToolError::Source(FdaError::RateLimited {
            retry_after_secs: None
        })
        .is_invalid_input());
    }
}
