use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod commands;

use commands::{ClassifyCommand, HealthCommand, SearchCommand};

#[derive(Parser)]
#[command(name = "regassist")]
#[command(about = "FDA predicate device search and device classification")]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search and rank 510(k) predicate devices
    Search(SearchCommand),
    /// Classify a device and name its regulatory pathway
    Classify(ClassifyCommand),
    /// Report tool health and circuit breaker state
    Health(HealthCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = app::load_config(cli.config.as_deref())?;
    common::init_structured_logging(&config.logging)?;
    let registry = app::build_registry(&config)?;
    let output = app::Output::new(cli.pretty);

    match cli.command {
        Commands::Search(cmd) => cmd.execute(&registry, &output).await,
        Commands::Classify(cmd) => cmd.execute(&registry, &output).await,
        Commands::Health(cmd) => cmd.execute(&registry, &output).await,
    }
}
