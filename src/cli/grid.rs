//! Grid command implementation

use clap::Args;
use std::path::PathBuf;

use super::{load_service, OutputFormat};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct GridArgs {
    /// JSON dataset with prices, indicators, and listings
    #[arg(long)]
    pub dataset: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl GridArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let ranges = config.grid_search.clone().unwrap_or_default();
        let service = load_service(&self.dataset, &config.engine)?;

        let outcomes = service.run_grid_search(&config.simulation, &ranges).await?;
        let ids: Vec<_> = outcomes.iter().map(|o| o.simulation_id).collect();
        let comparison = service.compare(&ids).await?;

        let mut results = Vec::new();
        for outcome in &outcomes {
            match &outcome.result {
                Ok(result) => results.push(result.clone()),
                Err(e) => eprintln!("Run {} failed: {}", outcome.simulation_id, e),
            }
        }

        match self.format {
            OutputFormat::Table => {
                for result in &results {
                    let status = service.get_status(result.simulation_id).await?;
                    println!("Parameters: {:?}", status.config.strategy);
                    println!("{}", result.format_table());
                }
                println!("{}", comparison.format_table());
            }
            OutputFormat::Json => {
                let report = serde_json::json!({
                    "runs": results,
                    "comparison": comparison,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Ok(())
    }
}
