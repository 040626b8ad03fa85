//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "negotiation-tck")]
#[command(about = "Provider-side contract negotiation conformance harness", long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a negotiation scenario against the local connector
    Run {
        /// Scenario file (JSON)
        scenario: PathBuf,
    },

    /// Print the negotiation state transition table
    States,
}
