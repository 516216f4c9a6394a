//! Registrations for the FDA-backed tools shipped with the workspace.

use anyhow::Context;
use chrono::NaiveDate;
use common::{AppConfig, SearchConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tools::{
    classification, predicate_search, DeviceClassificationTool, FdaDataSource, PredicateSearchTool,
    Tool,
};

use super::{ToolParams, ToolRegistration, ToolRegistry, ToolStatus};

const SEARCH_PARAM: &str = "search";
const REFERENCE_DATE_PARAM: &str = "reference_date";

fn search_config(params: &ToolParams) -> anyhow::Result<SearchConfig> {
    match params.get(SEARCH_PARAM) {
        Some(value) => serde_json::from_value(value.clone()).context("invalid search parameters"),
        None => Ok(SearchConfig::default()),
    }
}

fn reference_date(params: &ToolParams) -> anyhow::Result<Option<NaiveDate>> {
    params
        .get(REFERENCE_DATE_PARAM)
        .and_then(|value| value.as_str())
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("invalid reference date '{}'", raw))
        })
        .transpose()
}

fn apply_registry_defaults(registration: ToolRegistration, config: &AppConfig) -> ToolRegistration {
    let registration = registration
        .retry_count(config.registry.retry.max_retries)
        .circuit_breaker_threshold(config.registry.circuit_breaker.failure_threshold);
    match config.registry.fda_rate_limit_per_minute {
        Some(limit) => registration.rate_limit(limit),
        None => registration,
    }
}

/// Registration for `fda_predicate_search`
pub fn predicate_search_registration(
    config: &AppConfig,
    source: Arc<dyn FdaDataSource>,
) -> anyhow::Result<ToolRegistration> {
    let search = serde_json::to_value(&config.search).context("serializing search config")?;
    let registration = ToolRegistration::new(predicate_search::TOOL_NAME, move |params| {
        let mut tool = PredicateSearchTool::new(Arc::clone(&source), search_config(params)?);
        if let Some(date) = reference_date(params)? {
            tool = tool.with_reference_date(date);
        }
        Ok(Arc::new(tool) as Arc<dyn Tool>)
    })
    .description("Search and rank FDA 510(k) predicate devices for a target device")
    .param(SEARCH_PARAM, search);

    Ok(apply_registry_defaults(registration, config))
}

/// Registration for `device_classification`
pub fn classification_registration(
    config: &AppConfig,
    source: Arc<dyn FdaDataSource>,
) -> ToolRegistration {
    let registration = ToolRegistration::new(classification::TOOL_NAME, move |_| {
        Ok(Arc::new(DeviceClassificationTool::new(Arc::clone(&source))) as Arc<dyn Tool>)
    })
    .description("Classify a medical device and name its regulatory pathway");

    apply_registry_defaults(registration, config)
}

/// Register both FDA tools; returns the resulting status per tool
pub fn register_builtin_tools(
    registry: &ToolRegistry,
    config: &AppConfig,
    source: Arc<dyn FdaDataSource>,
) -> anyhow::Result<BTreeMap<String, ToolStatus>> {
    let mut statuses = BTreeMap::new();
    for registration in [
        predicate_search_registration(config, Arc::clone(&source))?,
        classification_registration(config, source),
    ] {
        let name = registration.name().to_string();
        statuses.insert(name, registry.register_tool(registration));
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tools::StaticFdaSource;

    #[test]
    fn test_builtin_tools_register_available() {
        let registry = ToolRegistry::default();
        let statuses = register_builtin_tools(
            &registry,
            &AppConfig::default(),
            Arc::new(StaticFdaSource::new()),
        )
        .unwrap();

        assert!(statuses.values().all(|s| *s == ToolStatus::Available));
        assert_eq!(
            registry.get_available_tools(),
            vec![
                "device_classification".to_string(),
                "fda_predicate_search".to_string()
            ]
        );
        let config = registry.tool_configuration("fda_predicate_search").unwrap();
        assert_eq!(config.rate_limit, Some(240));
    }

    #[test]
    fn test_bad_reference_date_marks_tool_error() {
        let registry = ToolRegistry::default();
        let registration =
            predicate_search_registration(&AppConfig::default(), Arc::new(StaticFdaSource::new()))
                .unwrap()
                .param(REFERENCE_DATE_PARAM, json!("June 2024"));

        assert_eq!(registry.register_tool(registration), ToolStatus::Error);
        assert!(registry.get_available_tools().is_empty());
    }
}
