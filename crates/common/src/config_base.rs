use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{ConfigError, ConfigResult};
use crate::structured_logging::{LogFormat, LoggingConfig};

/// Base configuration for per-tool circuit breakers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfigBase {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerConfigBase {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
        }
    }
}

impl CircuitBreakerConfigBase {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

/// Base configuration for retries: delay = initial_backoff * multiplier^attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfigBase {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfigBase {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Defaults applied to every tool registered without explicit overrides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub tool_timeout_secs: u64,
    pub circuit_breaker: CircuitBreakerConfigBase,
    pub retry: RetryConfigBase,
    /// Advisory requests/minute for the FDA-backed tools
    pub fda_rate_limit_per_minute: Option<u32>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            circuit_breaker: CircuitBreakerConfigBase::default(),
            retry: RetryConfigBase::default(),
            fda_rate_limit_per_minute: Some(240),
        }
    }
}

impl RegistryConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// openFDA connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FdaApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FdaApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fda.gov".to_string(),
            api_key: None,
            request_timeout_secs: 20,
            user_agent: concat!("regassist/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FdaApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Predicate search tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub default_max_results: usize,
    /// Candidates fetched per requested result before ranking
    pub candidate_multiplier: usize,
    pub max_candidates: usize,
    pub max_search_terms: usize,
    /// Candidates scoring at or below this similarity are dropped
    pub min_similarity: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: 10,
            candidate_multiplier: 3,
            max_candidates: 100,
            max_search_terms: 5,
            min_similarity: 0.0,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub fda: FdaApiConfig,
    pub registry: RegistryConfig,
    pub search: SearchConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file; missing sections take defaults
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FDA_API_BASE_URL") {
            self.fda.base_url = url;
        }
        if let Some(key) = lookup("FDA_API_KEY") {
            self.fda.api_key = (!key.trim().is_empty()).then_some(key);
        }
        if let Some(raw) = lookup("FDA_REQUEST_TIMEOUT_SECS") {
            self.fda.request_timeout_secs = parse_value("FDA_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("REGISTRY_TOOL_TIMEOUT_SECS") {
            self.registry.tool_timeout_secs = parse_value("REGISTRY_TOOL_TIMEOUT_SECS", &raw)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(raw) = lookup("LOG_FORMAT") {
            self.logging.format = parse_value("LOG_FORMAT", &raw)?;
        }
        if let Some(raw) = lookup("LOG_JSON") {
            if parse_value::<bool>("LOG_JSON", &raw)? {
                self.logging.format = LogFormat::Json;
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fda.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("fda.base_url", "must not be empty"));
        }
        if self.registry.tool_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "registry.tool_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.registry.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "registry.circuit_breaker.failure_threshold",
                "must be greater than zero",
            ));
        }
        if self.registry.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "registry.retry.backoff_multiplier",
                "must be at least 1.0",
            ));
        }
        if self.search.default_max_results == 0 {
            return Err(ConfigError::invalid(
                "search.default_max_results",
                "must be greater than zero",
            ));
        }
        if self.search.candidate_multiplier == 0 || self.search.max_candidates == 0 {
            return Err(ConfigError::invalid(
                "search.candidate_multiplier",
                "candidate_multiplier and max_candidates must be greater than zero",
            ));
        }
        if !(0.0..1.0).contains(&self.search.min_similarity) {
            return Err(ConfigError::invalid(
                "search.min_similarity",
                "must be within [0, 1)",
            ));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registry.retry.max_retries, 3);
        assert_eq!(config.registry.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.search.default_max_results, 10);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[fda]\nbase_url = \"http://localhost:9000\"\n\n[registry.circuit_breaker]\nfailure_threshold = 2\n"
        )
        .expect("write config");

        let config = AppConfig::from_file(file.path()).expect("config should load");
        assert_eq!(config.fda.base_url, "http://localhost:9000");
        assert_eq!(config.registry.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.registry.circuit_breaker.recovery_timeout_secs, 60);
        assert_eq!(config.registry.tool_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = AppConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FDA_API_KEY", "secret"),
            ("REGISTRY_TOOL_TIMEOUT_SECS", "5"),
            ("LOG_JSON", "true"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(config.fda.api_key.as_deref(), Some("secret"));
        assert_eq!(config.registry.tool_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == "REGISTRY_TOOL_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut config = AppConfig::default();
        config.registry.tool_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
