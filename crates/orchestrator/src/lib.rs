//! Tool orchestration for RegAssist.
//!
//! [`ToolRegistry`] owns the regulatory tools and runs every call through a
//! per-tool [`CircuitBreaker`], a wall-clock timeout and a retry loop driven
//! by [`BackoffStrategy`].
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use common::AppConfig;
//! use orchestrator::{register_builtin_tools, ToolRegistry};
//! use tools::{OpenFdaClient, ToolInput};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let registry = ToolRegistry::from_config(&config.registry);
//!     let source = Arc::new(OpenFdaClient::new(&config.fda)?);
//!     register_builtin_tools(&registry, &config, source)?;
//!
//!     let input = ToolInput::new()
//!         .with_arg("device_description", "Implantable cardiac pacemaker")
//!         .with_arg("intended_use", "Treatment of bradycardia");
//!     let output = registry.execute_tool("fda_predicate_search", input).await?;
//!     println!("{}", output.result);
//!     Ok(())
//! }
//! ```

pub mod registry;
pub mod reliability;

pub use registry::{
    classification_registration, predicate_search_registration, register_builtin_tools,
    AttemptError, RegistryError, RegistryOptions, ToolConfiguration, ToolFactory,
    ToolHealthReport, ToolParams, ToolRegistration, ToolRegistry, ToolStatus,
    DEFAULT_CIRCUIT_BREAKER_THRESHOLD, DEFAULT_RETRY_COUNT,
};
pub use reliability::{
    BackoffStrategy, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot,
    CircuitBreakerState, RateWindow,
};
