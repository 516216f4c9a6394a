use anyhow::{Context, Result};
use common::AppConfig;
use console::style;
use orchestrator::{register_builtin_tools, ToolRegistry, ToolStatus};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tools::{FdaDataSource, OpenFdaClient};
use tracing::warn;

/// Layered configuration: file (or defaults), then `.env`, then environment
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    dotenv::dotenv().ok();

    let mut config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

/// Registry with the FDA tools backed by the openFDA API
pub fn build_registry(config: &AppConfig) -> Result<Arc<ToolRegistry>> {
    let source: Arc<dyn FdaDataSource> =
        Arc::new(OpenFdaClient::new(&config.fda).context("creating openFDA client")?);
    let registry = Arc::new(ToolRegistry::from_config(&config.registry));

    for (tool, status) in register_builtin_tools(&registry, config, source)? {
        if status != ToolStatus::Available {
            warn!(tool = %tool, status = %status, "Tool registered but not available");
        }
    }
    Ok(registry)
}

/// Results go to stdout as JSON, status lines to stderr
pub struct Output {
    pretty: bool,
}

impl Output {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{}", rendered);
        Ok(())
    }

    pub fn status(&self, ok: bool, message: impl AsRef<str>) {
        let marker = if ok {
            style("[ok]").green().bold()
        } else {
            style("[!!]").red().bold()
        };
        eprintln!("{} {}", marker, message.as_ref());
    }
}
