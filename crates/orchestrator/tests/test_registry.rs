use anyhow::Result;
use async_trait::async_trait;
use orchestrator::{
    AttemptError, BackoffStrategy, CircuitBreakerState, RegistryError, RegistryOptions,
    ToolRegistration, ToolRegistry, ToolStatus,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tools::{Tool, ToolHealth, ToolInput, ToolOutput, ToolSpec};

/// Scripted tool: fails a fixed number of calls, optionally sleeps first
struct MockTool {
    name: String,
    calls: Arc<AtomicUsize>,
    failures_left: AtomicUsize,
    delay: Duration,
    probe: Option<ToolHealth>,
}

impl MockTool {
    fn new(name: &str, calls: Arc<AtomicUsize>) -> Self {
        Self {
            name: name.to_string(),
            calls,
            failures_left: AtomicUsize::new(0),
            delay: Duration::ZERO,
            probe: None,
        }
    }

    fn failing(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_probe(mut self, health: ToolHealth) -> Self {
        self.probe = Some(health);
        self
    }
}

#[async_trait]
impl Tool for MockTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: format!("Mock tool {}", self.name),
            usage: format!("{} <args>", self.name),
            examples: vec![],
            input_schema: json!({"type": "object"}),
        }
    }

    async fn execute(&self, _input: ToolInput) -> Result<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("{} failed", self.name);
        }
        Ok(ToolOutput::ok(json!({ "tool": self.name })))
    }

    async fn check_health(&self) -> Option<ToolHealth> {
        self.probe.clone()
    }
}

fn fast_registry() -> ToolRegistry {
    ToolRegistry::new(
        RegistryOptions::default()
            .with_default_timeout(Duration::from_secs(5))
            .with_recovery_timeout(Duration::from_millis(50))
            .with_backoff(BackoffStrategy::Fixed {
                delay: Duration::from_millis(1),
            }),
    )
}

/// Registers a tool built by `build` (called once per instantiation)
fn register<F>(registry: &ToolRegistry, name: &str, build: F) -> ToolStatus
where
    F: Fn() -> MockTool + Send + Sync + 'static,
{
    registry.register_tool(ToolRegistration::new(name, move |_| {
        Ok(Arc::new(build()) as Arc<dyn Tool>)
    }))
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[test]
fn test_get_unknown_tool_is_not_found() {
    let registry = fast_registry();
    assert!(matches!(
        registry.get_tool("missing"),
        Err(RegistryError::ToolNotFound(name)) if name == "missing"
    ));
    assert!(matches!(
        registry.update_tool_status("missing", ToolStatus::Maintenance),
        Err(RegistryError::ToolNotFound(_))
    ));
}

#[tokio::test]
async fn test_failing_factory_is_isolated() {
    let registry = fast_registry();
    let status = registry.register_tool(ToolRegistration::new("broken", |_| {
        anyhow::bail!("missing credentials")
    }));
    assert_eq!(status, ToolStatus::Error);

    let calls = counter();
    let shared = Arc::clone(&calls);
    assert_eq!(
        register(&registry, "healthy", move || MockTool::new("healthy", Arc::clone(&shared))),
        ToolStatus::Available
    );

    assert!(matches!(
        registry.get_tool("broken"),
        Err(RegistryError::ToolUnavailable { status: ToolStatus::Error, .. })
    ));
    assert_eq!(registry.get_available_tools(), vec!["healthy".to_string()]);

    registry
        .execute_tool("healthy", ToolInput::new())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_gating_order_status_before_breaker() {
    let registry = fast_registry();
    registry.register_tool(
        ToolRegistration::new("gated", |_| Ok(Arc::new(MockTool::new("gated", counter())) as Arc<dyn Tool>))
            .depends_on("absent"),
    );

    // dependency is checked last
    assert!(matches!(
        registry.get_tool("gated"),
        Err(RegistryError::DependencyUnavailable { dependency, .. }) if dependency == "absent"
    ));

    registry
        .update_tool_status("gated", ToolStatus::Maintenance)
        .unwrap();
    assert!(matches!(
        registry.get_tool("gated"),
        Err(RegistryError::ToolUnavailable { status: ToolStatus::Maintenance, .. })
    ));
}

#[tokio::test]
async fn test_dependency_must_be_healthy() {
    let registry = fast_registry();
    register(&registry, "base", || MockTool::new("base", counter()).failing(usize::MAX));
    registry.register_tool(
        ToolRegistration::new("derived", |_| {
            Ok(Arc::new(MockTool::new("derived", counter())) as Arc<dyn Tool>)
        })
        .depends_on("base"),
    );

    assert!(registry.get_tool("derived").is_ok());

    let err = registry
        .execute_tool("base", ToolInput::new())
        .await
        .unwrap_err();
    assert!(!err.is_gating());

    assert!(matches!(
        registry.get_tool("derived"),
        Err(RegistryError::DependencyUnavailable { dependency, .. }) if dependency == "base"
    ));
}

#[tokio::test]
async fn test_retry_recovers_and_resets_breaker() {
    let registry = fast_registry();
    let calls = counter();
    let shared = Arc::clone(&calls);
    register(&registry, "flaky", move || MockTool::new("flaky", Arc::clone(&shared)).failing(2));

    let output = registry
        .execute_tool("flaky", ToolInput::new())
        .await
        .unwrap();

    assert!(output.success);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let breaker = registry.circuit_breaker("flaky").unwrap();
    assert_eq!(breaker.state, CircuitBreakerState::Closed);
    assert_eq!(breaker.failure_count, 0);
    assert_eq!(registry.get_available_tools(), vec!["flaky".to_string()]);
}

#[tokio::test]
async fn test_exhausted_retries_record_one_failure() {
    let registry = fast_registry();
    let calls = counter();
    let shared = Arc::clone(&calls);
    registry.register_tool(
        ToolRegistration::new("down", move |_| {
            Ok(Arc::new(MockTool::new("down", Arc::clone(&shared)).failing(usize::MAX)) as Arc<dyn Tool>)
        })
        .retry_count(2),
    );

    let err = registry
        .execute_tool("down", ToolInput::new())
        .await
        .unwrap_err();

    match err {
        RegistryError::ExecutionFailed { attempts, source, .. } => {
            assert_eq!(attempts, 3);
            assert!(source.to_string().contains("down failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(registry.circuit_breaker("down").unwrap().failure_count, 1);
    assert!(registry.get_available_tools().is_empty());
}

#[tokio::test]
async fn test_breaker_opens_then_half_opens_after_recovery() {
    let registry = fast_registry();
    let calls = counter();
    let shared = Arc::clone(&calls);
    registry.register_tool(
        ToolRegistration::new("unstable", move |_| {
            Ok(Arc::new(MockTool::new("unstable", Arc::clone(&shared)).failing(2)) as Arc<dyn Tool>)
        })
        .retry_count(0)
        .circuit_breaker_threshold(2),
    );

    for _ in 0..2 {
        assert!(registry
            .execute_tool("unstable", ToolInput::new())
            .await
            .is_err());
    }
    assert_eq!(
        registry.circuit_breaker("unstable").unwrap().state,
        CircuitBreakerState::Open
    );

    let blocked = registry
        .execute_tool("unstable", ToolInput::new())
        .await
        .unwrap_err();
    assert!(matches!(blocked, RegistryError::CircuitOpen { .. }));
    assert!(blocked.is_gating());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_millis(80)).await;
    registry
        .execute_tool("unstable", ToolInput::new())
        .await
        .unwrap();

    let breaker = registry.circuit_breaker("unstable").unwrap();
    assert_eq!(breaker.state, CircuitBreakerState::Closed);
    assert_eq!(breaker.failure_count, 0);
}

#[tokio::test]
async fn test_timeout_counts_as_failure() {
    let registry = fast_registry();
    registry.register_tool(
        ToolRegistration::new("sluggish", |_| {
            Ok(Arc::new(MockTool::new("sluggish", counter()).slow(Duration::from_millis(500))) as Arc<dyn Tool>)
        })
        .timeout(Duration::from_millis(20))
        .retry_count(0),
    );

    let err = registry
        .execute_tool("sluggish", ToolInput::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RegistryError::ExecutionFailed {
            source: AttemptError::Timeout { .. },
            attempts: 1,
            ..
        }
    ));
    assert_eq!(registry.circuit_breaker("sluggish").unwrap().failure_count, 1);
}

#[tokio::test]
async fn test_abandoned_call_is_recorded_as_failure() {
    let registry = fast_registry();
    register(&registry, "stuck", || {
        MockTool::new("stuck", counter()).slow(Duration::from_secs(10))
    });

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        registry.execute_tool("stuck", ToolInput::new()),
    )
    .await;
    assert!(abandoned.is_err());

    assert_eq!(registry.circuit_breaker("stuck").unwrap().failure_count, 1);
    assert!(registry.get_available_tools().is_empty());
}

#[tokio::test]
async fn test_lazy_instantiation_after_status_reset() {
    let registry = fast_registry();
    let builds = counter();
    let shared = Arc::clone(&builds);
    let status = registry.register_tool(ToolRegistration::new("late", move |_| {
        if shared.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("backend not ready");
        }
        Ok(Arc::new(MockTool::new("late", counter())) as Arc<dyn Tool>)
    }));
    assert_eq!(status, ToolStatus::Error);

    registry
        .update_tool_status("late", ToolStatus::Available)
        .unwrap();
    assert!(registry.get_tool("late").is_ok());
    assert!(registry.get_tool("late").is_ok());
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_lazy_instantiation_failure_sets_error() {
    let registry = fast_registry();
    registry.register_tool(ToolRegistration::new("never", |_| anyhow::bail!("no backend")));
    registry
        .update_tool_status("never", ToolStatus::Available)
        .unwrap();

    assert!(matches!(
        registry.get_tool("never"),
        Err(RegistryError::InstantiationFailed { reason, .. }) if reason.contains("no backend")
    ));
    assert_eq!(
        registry.tool_configuration("never").unwrap().status,
        ToolStatus::Error
    );
}

#[tokio::test]
async fn test_health_check_reports() {
    let registry = fast_registry();
    register(&registry, "probed", || {
        MockTool::new("probed", counter()).with_probe(ToolHealth::unhealthy("upstream down"))
    });
    register(&registry, "plain", || MockTool::new("plain", counter()));
    register(&registry, "paused", || MockTool::new("paused", counter()));
    registry
        .update_tool_status("paused", ToolStatus::Maintenance)
        .unwrap();

    let all = registry.health_check(None).await;
    assert_eq!(all.len(), 3);

    assert!(!all["probed"].healthy);
    assert_eq!(all["probed"].detail, "upstream down");
    assert!(all["plain"].healthy);
    assert_eq!(all["plain"].circuit_breaker_state, Some(CircuitBreakerState::Closed));
    assert!(!all["paused"].healthy);
    assert_eq!(all["paused"].status, Some(ToolStatus::Maintenance));

    assert_eq!(registry.get_available_tools(), vec!["plain".to_string()]);

    let unknown = registry.health_check(Some("ghost")).await;
    assert!(!unknown["ghost"].healthy);
    assert!(unknown["ghost"].status.is_none());
}

#[tokio::test]
async fn test_rate_limit_is_advisory() {
    let registry = fast_registry();
    registry.register_tool(
        ToolRegistration::new("limited", |_| {
            Ok(Arc::new(MockTool::new("limited", counter())) as Arc<dyn Tool>)
        })
        .rate_limit(1),
    );

    for _ in 0..2 {
        registry
            .execute_tool("limited", ToolInput::new())
            .await
            .unwrap();
    }

    let report = registry.health_check(Some("limited")).await;
    assert!(report["limited"].rate_limited);
    assert!(report["limited"].healthy);
}

#[test]
fn test_list_tools_is_sorted() {
    let registry = fast_registry();
    register(&registry, "zeta", || MockTool::new("zeta", counter()));
    register(&registry, "alpha", || MockTool::new("alpha", counter()));

    let names: Vec<String> = registry.list_tools().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
}
