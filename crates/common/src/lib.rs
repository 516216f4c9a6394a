//! Shared plumbing for the RegAssist workspace: structured logging,
//! layered configuration and the configuration error type.

pub mod config_base;
pub mod errors;
pub mod structured_logging;

pub use config_base::{
    AppConfig, CircuitBreakerConfigBase, FdaApiConfig, RegistryConfig, RetryConfigBase,
    SearchConfig,
};
pub use errors::{ConfigError, ConfigResult};
pub use structured_logging::{init_structured_logging, LogFormat, LoggingConfig, OperationTimer};
