use anyhow::Result;
use clap::Args;
use orchestrator::ToolRegistry;
use tools::{classification, ClassificationResult, ToolInput};

use crate::app::Output;

#[derive(Debug, Args)]
pub struct ClassifyCommand {
    #[arg(long = "description")]
    device_description: String,

    #[arg(long)]
    intended_use: String,

    /// Generic device name used for the FDA classification lookup
    #[arg(long)]
    device_type: Option<String>,
}

impl ClassifyCommand {
    pub async fn execute(self, registry: &ToolRegistry, output: &Output) -> Result<()> {
        let mut input = ToolInput::new()
            .with_arg("device_description", self.device_description)
            .with_arg("intended_use", self.intended_use);
        if let Some(device_type) = self.device_type {
            input = input.with_arg("device_type", device_type);
        }

        let response = registry
            .execute_tool(classification::TOOL_NAME, input)
            .await?;
        let result: ClassificationResult = serde_json::from_value(response.result)?;

        output.status(
            true,
            format!(
                "Class {} via {}{}",
                result.device_class,
                result.regulatory_pathway,
                if result.fda_confirmed { " (FDA confirmed)" } else { "" }
            ),
        );
        output.json(&result)
    }
}
