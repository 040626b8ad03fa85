//! Negotiation harness CLI binary

use anyhow::Context;
use clap::Parser;
use negotiation_tck::cli::{Cli, Commands, Scenario, TckApp};
use negotiation_tck::{NegotiationState, TckConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TckConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TckConfig::default(),
    }
    .apply_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    match cli.command {
        Commands::Run { scenario } => {
            let scenario = Scenario::load(&scenario)
                .with_context(|| format!("failed to load scenario {}", scenario.display()))?;

            let app = TckApp::new(config)?;
            let report = app.run_scenario(&scenario).await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::States => {
            for state in NegotiationState::ALL {
                let successors = if state.is_terminal() {
                    "(terminal)".to_string()
                } else {
                    let successors: Vec<String> =
                        state.successors().iter().map(|s| s.to_string()).collect();
                    successors.join(", ")
                };
                println!("{:<12} -> {}", state.to_string(), successors);
            }
        }
    }

    Ok(())
}
