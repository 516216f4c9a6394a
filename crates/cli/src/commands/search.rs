use anyhow::Result;
use clap::Args;
use orchestrator::ToolRegistry;
use tools::predicate::PredicateSearchResult;
use tools::{predicate_search, ToolInput};

use crate::app::Output;

#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Free-text description of the target device
    #[arg(long = "description")]
    device_description: String,

    /// Intended use / indications for use
    #[arg(long)]
    intended_use: String,

    /// Three-letter FDA product code to restrict candidates
    #[arg(long)]
    product_code: Option<String>,

    /// Device class (I, II or III)
    #[arg(long)]
    device_class: Option<String>,

    /// Technology characteristic, repeatable
    #[arg(long = "technology")]
    technology_characteristics: Vec<String>,

    #[arg(long)]
    max_results: Option<usize>,
}

impl SearchCommand {
    fn to_input(&self) -> ToolInput {
        let mut input = ToolInput::new()
            .with_arg("device_description", self.device_description.as_str())
            .with_arg("intended_use", self.intended_use.as_str());
        if let Some(code) = &self.product_code {
            input = input.with_arg("product_code", code.as_str());
        }
        if let Some(class) = &self.device_class {
            input = input.with_arg("device_class", class.as_str());
        }
        if !self.technology_characteristics.is_empty() {
            input = input.with_arg(
                "technology_characteristics",
                self.technology_characteristics.clone(),
            );
        }
        if let Some(max) = self.max_results {
            input = input.with_arg("max_results", max);
        }
        input
    }

    pub async fn execute(self, registry: &ToolRegistry, output: &Output) -> Result<()> {
        let response = registry
            .execute_tool(predicate_search::TOOL_NAME, self.to_input())
            .await?;
        let result: PredicateSearchResult = serde_json::from_value(response.result)?;

        match result.best_match() {
            Some(best) => output.status(
                true,
                format!(
                    "{} predicate(s) found, best {} ({:.0}%)",
                    result.predicates.len(),
                    best.clearance_number,
                    best.confidence_score * 100.0
                ),
            ),
            None => output.status(false, "No predicate devices found"),
        }
        output.json(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        search: SearchCommand,
    }

    #[test]
    fn test_search_arguments_map_to_tool_input() {
        let harness = Harness::parse_from([
            "regassist",
            "--description",
            "Wireless glucose monitor",
            "--intended-use",
            "Continuous glucose monitoring",
            "--technology",
            "bluetooth",
            "--technology",
            "sensor",
            "--max-results",
            "3",
        ]);
        let input = harness.search.to_input();

        assert_eq!(input.get_str("device_description"), Some("Wireless glucose monitor"));
        assert_eq!(input.get_usize("max_results").unwrap(), Some(3));
        assert_eq!(
            input.get_string_list("technology_characteristics").unwrap(),
            vec!["bluetooth".to_string(), "sensor".to_string()]
        );
        assert!(input.get_str("product_code").is_none());
    }
}
