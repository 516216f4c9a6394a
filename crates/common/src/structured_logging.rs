//! Logging setup shared by the binary and the library crates.
//!
//! Logs always go to stderr so stdout stays reserved for tool results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::io;
use std::str::FromStr;
use std::time::Instant;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Rendering of the log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event, fields flattened to the top level
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "full" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
    pub ansi: bool,
    pub line_numbers: bool,
    /// Extra per-target directives, e.g. `orchestrator::registry=debug`
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            ansi: true,
            line_numbers: cfg!(debug_assertions),
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// `RUST_LOG` wins; otherwise `level` plus `directives`
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let mut filter = EnvFilter::try_new(&self.level)?;
        for directive in &self.directives {
            filter = filter.add_directive(directive.parse::<Directive>()?);
        }
        Ok(filter)
    }
}

/// Install the global tracing subscriber. Fails if one is already set.
pub fn init_structured_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let registry = Registry::default().with(config.env_filter()?);
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_line_number(config.line_numbers);

    match config.format {
        LogFormat::Json => {
            let layer = layer
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
        LogFormat::Compact => {
            let layer = layer.compact().with_ansi(config.ansi);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
        LogFormat::Pretty => {
            let layer = layer
                .with_ansi(config.ansi)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
    }
    Ok(())
}

/// Times one operation and logs its outcome together with collected fields
pub struct OperationTimer {
    operation: String,
    started: Instant,
    fields: Map<String, Value>,
}

impl OperationTimer {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            started: Instant::now(),
            fields: Map::new(),
        }
    }

    /// Values that fail to serialize are dropped
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.fields.insert(key.into(), value);
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn finish(self) {
        self.finish_with_result::<(), String>(&Ok(()));
    }

    pub fn finish_with_result<T, E: Display>(self, result: &Result<T, E>) {
        let duration_ms = self.elapsed_ms();
        let fields = Value::Object(self.fields);
        match result {
            Ok(_) => tracing::info!(
                operation = %self.operation,
                duration_ms,
                fields = %fields,
                "Operation completed"
            ),
            Err(e) => tracing::warn!(
                operation = %self.operation,
                duration_ms,
                error = %e,
                fields = %fields,
                "Operation failed"
            ),
        }
    }
}
