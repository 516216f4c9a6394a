//! Tool registry.
//!
//! Owns every registered tool together with its configuration, circuit
//! breaker, cached instance and last known health. Calls go through
//! [`ToolRegistry::execute_tool`], which gates on status, breaker and
//! dependencies, enforces the per-tool timeout and retries failed attempts
//! with backoff.

use common::RegistryConfig;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tools::{Tool, ToolError, ToolInput, ToolOutput};
use tracing::{debug, info, warn};

mod builtin;
mod error;
mod health;
mod registration;

pub use builtin::{
    classification_registration, predicate_search_registration, register_builtin_tools,
};
pub use error::{AttemptError, RegistryError};
pub use health::ToolHealthReport;
pub use registration::{
    ToolConfiguration, ToolFactory, ToolParams, ToolRegistration, ToolStatus,
    DEFAULT_CIRCUIT_BREAKER_THRESHOLD, DEFAULT_RETRY_COUNT,
};

use crate::reliability::{
    BackoffStrategy, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, RateWindow,
};
use health::HealthRecord;

/// Registry-wide defaults
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryOptions {
    /// Applied to registrations without an explicit timeout
    pub default_timeout: Duration,
    pub recovery_timeout: Duration,
    pub backoff: BackoffStrategy,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from(&RegistryConfig::default())
    }
}

impl From<&RegistryConfig> for RegistryOptions {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            default_timeout: config.tool_timeout(),
            recovery_timeout: config.circuit_breaker.recovery_timeout(),
            backoff: BackoffStrategy::from(&config.retry),
        }
    }
}

impl RegistryOptions {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }
}

struct ToolEntry {
    name: String,
    config: Mutex<ToolConfiguration>,
    factory: ToolFactory,
    params: ToolParams,
    breaker: CircuitBreaker,
    instance: RwLock<Option<Arc<dyn Tool>>>,
    health: Mutex<HealthRecord>,
    rate: Option<RateWindow>,
}

impl ToolEntry {
    fn status(&self) -> ToolStatus {
        self.config.lock().status
    }

    fn set_status(&self, status: ToolStatus) {
        self.config.lock().status = status;
    }

    fn is_healthy(&self) -> bool {
        self.health.lock().healthy
    }

    fn set_health(&self, healthy: bool, detail: impl Into<String>) {
        *self.health.lock() = HealthRecord::new(healthy, detail);
    }

    fn cached_instance(&self) -> Option<Arc<dyn Tool>> {
        self.instance.read().clone()
    }

    /// Build the tool if it is not cached yet. A factory failure moves the
    /// tool to `error`.
    fn instantiate(&self) -> Result<Arc<dyn Tool>, RegistryError> {
        if let Some(tool) = self.cached_instance() {
            return Ok(tool);
        }

        let mut slot = self.instance.write();
        if let Some(tool) = slot.as_ref() {
            return Ok(Arc::clone(tool));
        }

        match (self.factory)(&self.params) {
            Ok(tool) => {
                *slot = Some(Arc::clone(&tool));
                debug!(tool = %self.name, "Tool instantiated");
                Ok(tool)
            }
            Err(err) => {
                let reason = format!("{:#}", err);
                warn!(tool = %self.name, error = %reason, "Tool instantiation failed");
                self.set_status(ToolStatus::Error);
                self.set_health(false, format!("Instantiation failed: {}", reason));
                Err(RegistryError::InstantiationFailed {
                    tool: self.name.clone(),
                    reason,
                })
            }
        }
    }

    fn record_success(&self) {
        self.breaker.record_success();
        self.set_health(true, "Last call succeeded");
    }

    fn record_failure(&self, detail: impl Into<String>) {
        self.breaker.record_failure();
        self.set_health(false, detail);
    }
}

/// Records one breaker failure if the caller abandons the first attempt
struct AbandonGuard<'a> {
    entry: &'a ToolEntry,
    armed: bool,
}

impl<'a> AbandonGuard<'a> {
    fn new(entry: &'a ToolEntry) -> Self {
        Self { entry, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(tool = %self.entry.name, "Tool call abandoned before completion");
            self.entry.record_failure("Call abandoned before completion");
        }
    }
}

/// Registry of tools keyed by name
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<ToolEntry>>>,
    options: RegistryOptions,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(RegistryOptions::default())
    }
}

impl ToolRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            options,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(RegistryOptions::from(config))
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Register (or replace) a tool and instantiate it eagerly.
    ///
    /// A failing factory leaves the tool registered with status `error`;
    /// it is never reported as an error to the caller.
    pub fn register_tool(&self, registration: ToolRegistration) -> ToolStatus {
        let ToolRegistration {
            name,
            description,
            factory,
            params,
            dependencies,
            rate_limit,
            timeout,
            retry_count,
            circuit_breaker_threshold,
        } = registration;

        let config = ToolConfiguration {
            name: name.clone(),
            description,
            dependencies,
            rate_limit,
            timeout: timeout.unwrap_or(self.options.default_timeout),
            retry_count,
            circuit_breaker_threshold,
            status: ToolStatus::Available,
        };

        let entry = Arc::new(ToolEntry {
            name: name.clone(),
            breaker: CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: circuit_breaker_threshold,
                recovery_timeout: self.options.recovery_timeout,
            }),
            rate: rate_limit.map(RateWindow::per_minute),
            config: Mutex::new(config),
            factory,
            params,
            instance: RwLock::new(None),
            health: Mutex::new(HealthRecord::new(false, "Not instantiated")),
        });

        if entry.instantiate().is_ok() {
            entry.set_health(true, "Instantiated");
        }
        let status = entry.status();

        let replaced = self.tools.write().insert(name.clone(), entry).is_some();
        info!(
            tool = %name,
            status = %status,
            replaced,
            "Registered tool"
        );
        status
    }

    fn entry(&self, name: &str) -> Result<Arc<ToolEntry>, RegistryError> {
        self.tools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ToolNotFound(name.to_string()))
    }

    fn dependency_healthy(&self, dependency: &str) -> bool {
        self.tools
            .read()
            .get(dependency)
            .map(|entry| entry.is_healthy())
            .unwrap_or(false)
    }

    /// Gate a call: registration, status, breaker, dependencies, then the
    /// (possibly lazily built) instance.
    fn resolve(&self, name: &str) -> Result<(Arc<ToolEntry>, Arc<dyn Tool>), RegistryError> {
        let entry = self.entry(name)?;

        let status = entry.status();
        if status != ToolStatus::Available {
            return Err(RegistryError::ToolUnavailable {
                tool: name.to_string(),
                status,
            });
        }

        if !entry.breaker.can_execute() {
            return Err(RegistryError::CircuitOpen {
                tool: name.to_string(),
            });
        }

        let dependencies = entry.config.lock().dependencies.clone();
        for dependency in dependencies {
            if !self.dependency_healthy(&dependency) {
                return Err(RegistryError::DependencyUnavailable {
                    tool: name.to_string(),
                    dependency,
                });
            }
        }

        let tool = entry.instantiate()?;
        Ok((entry, tool))
    }

    /// Get a ready-to-call tool instance
    pub fn get_tool(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        self.resolve(name).map(|(_, tool)| tool)
    }

    /// Execute a tool with timeout, breaker accounting and retries.
    ///
    /// The first failed attempt is recorded against the breaker; retries run
    /// against the same instance without re-gating. Gating errors are
    /// returned immediately, as are argument errors reported by the tool,
    /// which leave the breaker untouched.
    pub async fn execute_tool(
        &self,
        name: &str,
        input: ToolInput,
    ) -> Result<ToolOutput, RegistryError> {
        let (entry, tool) = self.resolve(name)?;
        let (timeout, retry_count) = {
            let config = entry.config.lock();
            (config.timeout, config.retry_count)
        };

        if let Some(window) = &entry.rate {
            if !window.record() {
                warn!(
                    tool = %name,
                    limit_per_minute = window.limit(),
                    "Tool rate limit exceeded"
                );
            }
        }

        let started = Instant::now();
        let mut guard = AbandonGuard::new(&entry);
        let first = run_attempt(&tool, input.clone(), timeout).await;
        guard.disarm();

        let mut last_error = match first {
            Ok(output) => {
                entry.record_success();
                info!(
                    tool = %name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Tool executed"
                );
                return Ok(output);
            }
            Err(err) if !err.is_retryable() => {
                debug!(tool = %name, error = %err, "Tool rejected its input");
                return Err(RegistryError::ExecutionFailed {
                    tool: name.to_string(),
                    attempts: 1,
                    source: err,
                });
            }
            Err(err) => {
                warn!(tool = %name, error = %err, "Tool execution failed");
                entry.record_failure(err.to_string());
                err
            }
        };

        for attempt in 0..retry_count {
            let delay = self.options.backoff.delay_for_attempt(attempt);
            debug!(tool = %name, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Retrying tool");
            tokio::time::sleep(delay).await;

            match run_attempt(&tool, input.clone(), timeout).await {
                Ok(output) => {
                    entry.record_success();
                    info!(
                        tool = %name,
                        retries = attempt + 1,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Tool executed after retry"
                    );
                    return Ok(output);
                }
                Err(err) => {
                    warn!(tool = %name, attempt = attempt + 1, error = %err, "Tool retry failed");
                    entry.set_health(false, err.to_string());
                    last_error = err;
                }
            }
        }

        Err(RegistryError::ExecutionFailed {
            tool: name.to_string(),
            attempts: retry_count + 1,
            source: last_error,
        })
    }

    /// Probe one tool (or all of them). Never fails; an unknown name yields
    /// an unhealthy entry.
    pub async fn health_check(&self, name: Option<&str>) -> BTreeMap<String, ToolHealthReport> {
        let targets: Vec<(String, Option<Arc<ToolEntry>>)> = match name {
            Some(name) => vec![(name.to_string(), self.tools.read().get(name).cloned())],
            None => self
                .tools
                .read()
                .iter()
                .map(|(name, entry)| (name.clone(), Some(Arc::clone(entry))))
                .collect(),
        };

        let mut reports = BTreeMap::new();
        for (name, entry) in targets {
            let report = match entry {
                Some(entry) => self.probe(&entry).await,
                None => ToolHealthReport::unknown(&name),
            };
            reports.insert(name, report);
        }
        reports
    }

    async fn probe(&self, entry: &ToolEntry) -> ToolHealthReport {
        let probed = match entry.cached_instance() {
            Some(tool) => tool.check_health().await,
            None => None,
        };

        let (healthy, detail) = match probed {
            Some(health) => (health.healthy, health.detail),
            None => match self.get_tool(&entry.name) {
                Ok(_) => (true, "Tool is reachable".to_string()),
                Err(err) => (false, err.to_string()),
            },
        };
        entry.set_health(healthy, detail);
        debug!(tool = %entry.name, healthy, "Health check completed");

        let record = entry.health.lock().clone();
        let snapshot = entry.breaker.snapshot();
        ToolHealthReport {
            status: Some(entry.status()),
            healthy: record.healthy,
            detail: record.detail,
            circuit_breaker_state: Some(snapshot.state),
            failure_count: snapshot.failure_count,
            last_failure_at: snapshot.last_failure_at,
            rate_limited: entry.rate.as_ref().is_some_and(RateWindow::is_exceeded),
            last_checked: record.last_checked,
        }
    }

    /// Names of tools that are available and healthy, sorted
    pub fn get_available_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .read()
            .iter()
            .filter(|(_, entry)| entry.status() == ToolStatus::Available && entry.is_healthy())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Operator status override
    pub fn update_tool_status(&self, name: &str, status: ToolStatus) -> Result<(), RegistryError> {
        let entry = self.entry(name)?;
        let previous = entry.status();
        entry.set_status(status);
        info!(tool = %name, from = %previous, to = %status, "Tool status updated");
        Ok(())
    }

    /// Configurations of every registered tool, sorted by name
    pub fn list_tools(&self) -> Vec<ToolConfiguration> {
        let mut configs: Vec<ToolConfiguration> = self
            .tools
            .read()
            .values()
            .map(|entry| entry.config.lock().clone())
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub fn tool_configuration(&self, name: &str) -> Result<ToolConfiguration, RegistryError> {
        Ok(self.entry(name)?.config.lock().clone())
    }

    pub fn circuit_breaker(&self, name: &str) -> Result<CircuitBreakerSnapshot, RegistryError> {
        Ok(self.entry(name)?.breaker.snapshot())
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

async fn run_attempt(
    tool: &Arc<dyn Tool>,
    input: ToolInput,
    timeout: Duration,
) -> Result<ToolOutput, AttemptError> {
    match tokio::time::timeout(timeout, tool.execute(input)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => {
            let invalid = err
                .downcast_ref::<ToolError>()
                .is_some_and(ToolError::is_invalid_input);
            if invalid {
                Err(AttemptError::InvalidInput(err.into()))
            } else {
                Err(AttemptError::Tool(err.into()))
            }
        }
        Err(_) => Err(AttemptError::Timeout { timeout }),
    }
}
