//! Run command implementation

use clap::Args;
use std::path::PathBuf;

use super::{load_service, OutputFormat};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON dataset with prices, indicators, and listings
    #[arg(long)]
    pub dataset: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let service = load_service(&self.dataset, &config.engine)?;
        tracing::info!(
            strategy = config.simulation.strategy.name(),
            dataset = %self.dataset.display(),
            "Running simulation"
        );

        let result = service.run_simulation(config.simulation.clone()).await?;
        match self.format {
            OutputFormat::Table => println!("{}", result.format_table()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        }
        Ok(())
    }
}
