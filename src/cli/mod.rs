//! CLI interface for equity-backtest
//!
//! Provides subcommands for:
//! - `run`: Run the configured simulation over a dataset
//! - `grid`: Run the configured grid search and compare the results
//! - `config`: Validate and show the loaded configuration

mod grid;
mod run;

pub use grid::GridArgs;
pub use run::RunArgs;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::Path;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::data::{Dataset, InMemoryStore};
use crate::ports::MarketPorts;
use crate::service::BacktestService;

#[derive(Parser, Debug)]
#[command(name = "equity-backtest")]
#[command(about = "Backtesting engine for quantitative equity strategies")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured simulation
    Run(RunArgs),
    /// Run the configured grid search
    Grid(GridArgs),
    /// Validate and show configuration
    Config,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Service over a dataset file and a fresh in-memory store
fn load_service(dataset: &Path, engine: &EngineConfig) -> anyhow::Result<BacktestService<InMemoryStore>> {
    let data = Dataset::load(dataset)
        .with_context(|| format!("Could not load dataset {}", dataset.display()))?
        .into_market_data();
    Ok(BacktestService::new(
        MarketPorts::from_source(Arc::new(data)),
        Arc::new(InMemoryStore::new()),
        engine,
    ))
}
