//! Regulatory tools: the uniform [`Tool`] contract, the FDA data source, the
//! predicate matching engine and the two tools built on top of it.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub mod classification;
pub mod error;
pub mod fda;
pub mod predicate;
pub mod predicate_search;

pub use classification::{ClassificationResult, DeviceClassificationTool};
pub use error::ToolError;
pub use fda::{
    ClassificationRecord, FdaDataSource, FdaError, OpenFdaClient, PredicateCandidate,
    PredicateQuery, StaticFdaSource,
};
pub use predicate_search::PredicateSearchTool;

/// Named arguments passed to a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolInput {
    pub args: Map<String, Value>,
}

impl ToolInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Build from a JSON object; any other JSON value is rejected
    pub fn from_json(value: Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(args) => Ok(Self { args }),
            other => Err(ToolError::InvalidArgument {
                name: "input".to_string(),
                reason: format!("expected a JSON object, got {}", other),
            }),
        }
    }

    /// Non-empty string argument, if present
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ToolError> {
        self.get_str(key)
            .ok_or_else(|| ToolError::MissingArgument(key.to_string()))
    }

    pub fn get_usize(&self, key: &str) -> Result<Option<usize>, ToolError> {
        match self.args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| ToolError::InvalidArgument {
                    name: key.to_string(),
                    reason: format!("expected a non-negative integer, got {}", value),
                }),
        }
    }

    /// String list argument; a single string is accepted as a one-element list
    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>, ToolError> {
        match self.args.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ToolError::InvalidArgument {
                            name: key.to_string(),
                            reason: format!("expected strings, got {}", item),
                        })
                })
                .collect(),
            Some(other) => Err(ToolError::InvalidArgument {
                name: key.to_string(),
                reason: format!("expected a list of strings, got {}", other),
            }),
        }
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    pub metadata: HashMap<String, String>,
}

impl ToolOutput {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Self-description of a tool (its input schema and usage)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub usage: String,
    pub examples: Vec<String>,
    pub input_schema: Value,
}

/// Outcome of a tool's own health probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolHealth {
    pub healthy: bool,
    pub detail: String,
}

impl ToolHealth {
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: true,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
        }
    }
}

/// Capability interface implemented by every registered tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Describe the tool and its input schema
    fn spec(&self) -> ToolSpec;

    async fn execute(&self, input: ToolInput) -> Result<ToolOutput>;

    /// Tool-specific health probe. `None` means the tool has no probe and the
    /// caller should fall back to its own liveness check.
    async fn check_health(&self) -> Option<ToolHealth> {
        None
    }
}
