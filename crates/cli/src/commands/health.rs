use anyhow::Result;
use clap::Args;
use orchestrator::ToolRegistry;

use crate::app::Output;

#[derive(Debug, Args)]
pub struct HealthCommand {
    /// Check a single tool instead of all of them
    #[arg(long)]
    tool: Option<String>,
}

impl HealthCommand {
    pub async fn execute(self, registry: &ToolRegistry, output: &Output) -> Result<()> {
        let reports = registry.health_check(self.tool.as_deref()).await;
        for (name, report) in &reports {
            output.status(report.healthy, format!("{}: {}", name, report.detail));
        }
        output.json(&reports)
    }
}
