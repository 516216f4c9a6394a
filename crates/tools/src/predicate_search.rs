use anyhow::Result;
use chrono::{NaiveDate, Utc};
use common::{OperationTimer, SearchConfig};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::fda::{normalize_device_class, FdaDataSource, PredicateQuery};
use crate::predicate::{ranked_keywords, PredicateMatcher, PredicateSearchResult, TargetDevice};
use crate::{Tool, ToolHealth, ToolInput, ToolOutput, ToolSpec};

pub const TOOL_NAME: &str = "fda_predicate_search";

/// Finds and ranks 510(k) predicate devices for a target device
pub struct PredicateSearchTool {
    source: Arc<dyn FdaDataSource>,
    config: SearchConfig,
    reference_date: Option<NaiveDate>,
}

impl PredicateSearchTool {
    pub fn new(source: Arc<dyn FdaDataSource>, config: SearchConfig) -> Self {
        Self {
            source,
            config,
            reference_date: None,
        }
    }

    /// Pin the date recency is measured from (defaults to today)
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn parse_target(&self, input: &ToolInput) -> Result<(TargetDevice, usize), ToolError> {
        let description = input.require_str("device_description")?;
        let intended_use = input.require_str("intended_use")?;

        let mut target = TargetDevice::new(description, intended_use)
            .with_technology(input.get_string_list("technology_characteristics")?);
        if let Some(code) = input.get_str("product_code") {
            target = target.with_product_code(code.to_ascii_uppercase());
        }
        if let Some(class) = input.get_str("device_class") {
            if normalize_device_class(class).is_none() {
                return Err(ToolError::InvalidArgument {
                    name: "device_class".to_string(),
                    reason: format!("'{}' is not one of I, II or III", class),
                });
            }
            target = target.with_device_class(class);
        }

        let max_results = input
            .get_usize("max_results")?
            .unwrap_or(self.config.default_max_results);
        if max_results == 0 {
            return Err(ToolError::InvalidArgument {
                name: "max_results".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok((target, max_results))
    }

    /// Most specific description keywords followed by the explicit technology terms
    fn search_terms(&self, target: &TargetDevice) -> Vec<String> {
        let mut terms = ranked_keywords(&target.description, self.config.max_search_terms);
        for term in &target.technology_characteristics {
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        terms
    }

    pub async fn search(&self, input: &ToolInput) -> Result<PredicateSearchResult, ToolError> {
        let (target, max_results) = self.parse_target(input)?;
        let search_terms = self.search_terms(&target);
        if search_terms.is_empty() && target.product_code.is_none() {
            return Err(ToolError::InvalidArgument {
                name: "device_description".to_string(),
                reason: "contains no searchable keywords and no product code was given"
                    .to_string(),
            });
        }

        let matcher = PredicateMatcher::new(
            self.reference_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        )
        .with_min_similarity(self.config.min_similarity);

        let query = PredicateQuery {
            search_terms: search_terms.clone(),
            product_code: target.product_code.clone(),
            device_class: target.device_class.clone(),
            limit: max_results
                .saturating_mul(self.config.candidate_multiplier)
                .min(self.config.max_candidates),
        };
        debug!(query = %query.describe(), limit = query.limit, "Searching predicate candidates");

        match self.source.search_predicates(&query).await {
            Ok(candidates) => Ok(matcher.evaluate(&target, &candidates, search_terms, max_results)),
            Err(e) if e.is_not_found() => {
                info!(query = %query.describe(), "No predicate candidates found");
                Ok(matcher.empty_result(&target, search_terms))
            }
            Err(e) => {
                warn!(error = %e, "Predicate candidate search failed");
                Err(ToolError::Source(e))
            }
        }
    }
}

#[async_trait::async_trait]
impl Tool for PredicateSearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_NAME.to_string(),
            description: "Find and rank FDA 510(k) predicate devices with a technological comparison"
                .to_string(),
            usage: "fda_predicate_search {device_description, intended_use, product_code?, device_class?, technology_characteristics?, max_results?}".to_string(),
            examples: vec![
                r#"{"device_description": "Implantable cardiac pacemaker with wireless telemetry", "intended_use": "Regulate heart rhythm in patients with bradycardia", "product_code": "DXY"}"#.to_string(),
            ],
            input_schema: json!({
                "type": "object",
                "required": ["device_description", "intended_use"],
                "properties": {
                    "device_description": {"type": "string"},
                    "intended_use": {"type": "string"},
                    "product_code": {"type": "string"},
                    "device_class": {"type": "string", "enum": ["I", "II", "III"]},
                    "technology_characteristics": {"type": "array", "items": {"type": "string"}},
                    "max_results": {"type": "integer", "minimum": 1, "default": 10}
                }
            }),
        }
    }

    async fn execute(&self, input: ToolInput) -> Result<ToolOutput> {
        let mut timer = OperationTimer::new("predicate_search");
        let result = self.search(&input).await;
        if let Ok(found) = &result {
            timer.add_field("predicates_found", found.predicates.len());
            timer.add_field("confidence_score", found.confidence_score);
        }
        timer.finish_with_result(&result);

        let found = result?;
        Ok(ToolOutput::ok(serde_json::to_value(&found)?)
            .with_metadata("predicates_found", found.predicates.len().to_string())
            .with_metadata("confidence_score", format!("{:.3}", found.confidence_score)))
    }

    async fn check_health(&self) -> Option<ToolHealth> {
        Some(match self.source.ping().await {
            Ok(()) => ToolHealth::healthy("FDA data source reachable"),
            Err(e) => ToolHealth::unhealthy(format!("FDA data source unreachable: {}", e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fda::{PredicateCandidate, StaticFdaSource};

    fn tool(candidates: Vec<PredicateCandidate>) -> PredicateSearchTool {
        let source = StaticFdaSource::new().with_candidates(candidates);
        PredicateSearchTool::new(Arc::new(source), SearchConfig::default())
            .with_reference_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_search_terms_prefer_specific_keywords_then_technology() {
        let tool = tool(Vec::new());
        let target = TargetDevice::new("Wireless glucose sensor with bluetooth transmitter", "")
            .with_technology(vec!["Bluetooth".to_string(), "lithium".to_string()]);
        let terms = tool.search_terms(&target);
        assert_eq!(terms[0], "transmitter");
        assert!(terms.contains(&"bluetooth".to_string()));
        assert_eq!(terms.last().map(String::as_str), Some("lithium"));
        assert_eq!(terms.iter().filter(|t| *t == "bluetooth").count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_inputs() {
        let tool = tool(Vec::new());

        let missing = ToolInput::new().with_arg("device_description", "Pacemaker");
        assert!(matches!(
            tool.search(&missing).await,
            Err(ToolError::MissingArgument(name)) if name == "intended_use"
        ));

        let bad_class = ToolInput::new()
            .with_arg("device_description", "Pacemaker")
            .with_arg("intended_use", "Pacing")
            .with_arg("device_class", "IV");
        assert!(matches!(
            tool.search(&bad_class).await,
            Err(ToolError::InvalidArgument { .. })
        ));

        let zero = ToolInput::new()
            .with_arg("device_description", "Pacemaker")
            .with_arg("intended_use", "Pacing")
            .with_arg("max_results", 0);
        assert!(tool.search(&zero).await.is_err());
    }

    #[tokio::test]
    async fn test_not_found_becomes_empty_result() {
        let tool = tool(Vec::new());
        let input = ToolInput::new()
            .with_arg("device_description", "Novel neural lace")
            .with_arg("intended_use", "Brain computer interface");

        let output = tool.execute(input).await.unwrap();
        assert!(output.success);
        assert_eq!(output.metadata["predicates_found"], "0");
        assert_eq!(output.result["search_statistics"]["total_predicates_found"], 0);
        assert_eq!(output.result["confidence_score"], 0.0);
    }

    #[tokio::test]
    async fn test_health_probe_uses_source_ping() {
        let tool = tool(Vec::new());
        let health = tool.check_health().await.unwrap();
        assert!(health.healthy);
    }
}
