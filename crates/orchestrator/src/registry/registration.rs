use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tools::Tool;

pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 5;

/// Construction parameters handed to a tool factory
pub type ToolParams = Map<String, Value>;

/// Builds a tool instance from its parameters
pub type ToolFactory = Arc<dyn Fn(&ToolParams) -> anyhow::Result<Arc<dyn Tool>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Available,
    Unavailable,
    Error,
    Maintenance,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ToolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "unavailable" => Ok(Self::Unavailable),
            "error" => Ok(Self::Error),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(format!("unknown tool status '{}'", other)),
        }
    }
}

/// Static configuration of a registered tool plus its current status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfiguration {
    pub name: String,
    pub description: String,
    pub dependencies: Vec<String>,
    /// Advisory requests per minute
    pub rate_limit: Option<u32>,
    pub timeout: Duration,
    pub retry_count: u32,
    pub circuit_breaker_threshold: u32,
    pub status: ToolStatus,
}

/// Everything needed to register a tool
#[derive(Clone)]
pub struct ToolRegistration {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) factory: ToolFactory,
    pub(crate) params: ToolParams,
    pub(crate) dependencies: Vec<String>,
    pub(crate) rate_limit: Option<u32>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) retry_count: u32,
    pub(crate) circuit_breaker_threshold: u32,
}

impl fmt::Debug for ToolRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistration")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("rate_limit", &self.rate_limit)
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .field("circuit_breaker_threshold", &self.circuit_breaker_threshold)
            .finish_non_exhaustive()
    }
}

impl ToolRegistration {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ToolParams) -> anyhow::Result<Arc<dyn Tool>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            factory: Arc::new(factory),
            params: ToolParams::new(),
            dependencies: Vec::new(),
            rate_limit: None,
            timeout: None,
            retry_count: DEFAULT_RETRY_COUNT,
            circuit_breaker_threshold: DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, tool: impl Into<String>) -> Self {
        self.dependencies.push(tool.into());
        self
    }

    pub fn rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit = Some(per_minute);
        self
    }

    /// Wall-clock limit per attempt; the registry default applies otherwise
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    pub fn circuit_breaker_threshold(mut self, failures: u32) -> Self {
        self.circuit_breaker_threshold = failures;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_registration_defaults() {
        let registration = ToolRegistration::new("noop", |_| anyhow::bail!("unused"));
        assert_eq!(registration.retry_count, 3);
        assert_eq!(registration.circuit_breaker_threshold, 5);
        assert!(registration.timeout.is_none());
        assert!(registration.dependencies.is_empty());
    }

    #[rstest]
    #[case("available", ToolStatus::Available)]
    #[case("Maintenance", ToolStatus::Maintenance)]
    #[case(" error ", ToolStatus::Error)]
    fn test_status_parsing(#[case] raw: &str, #[case] expected: ToolStatus) {
        assert_eq!(raw.parse::<ToolStatus>().unwrap(), expected);
    }

    #[test]
    fn test_status_rejects_unknown() {
        assert!("retired".parse::<ToolStatus>().is_err());
    }
}
