//! CLI module for the negotiation harness

pub mod app;
pub mod commands;
pub mod scenario;

pub use app::TckApp;
pub use commands::{Cli, Commands};
pub use scenario::{Scenario, ScenarioReport, Step};
