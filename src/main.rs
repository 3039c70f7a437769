use clap::Parser;
use equity_backtest::cli::{Cli, Commands};
use equity_backtest::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(include_str!("../config.toml.example"))?
        }
    };

    // Initialize telemetry
    let _telemetry = equity_backtest::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            config.simulation.validate()?;
            args.execute(&config).await?;
        }
        Commands::Grid(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            config.simulation.validate()?;
            println!("Current configuration:");
            println!("  Log: {} ({:?})", config.telemetry.log_level, config.telemetry.log_format);
            println!("  Workers: {}", config.engine.worker_limit());
            println!(
                "  Period: {} .. {} ({:?})",
                config.simulation.start_date,
                config.simulation.end_date,
                config.simulation.rebalancing_period
            );
            println!("  Capital: {}", config.simulation.initial_capital);
            println!(
                "  Costs: fee={}, tax={}, slippage={:?}",
                config.simulation.fee_rate, config.simulation.tax_rate, config.simulation.slippage
            );
            println!("  Strategy: {:?}", config.simulation.strategy);
            if let Some(grid) = &config.grid_search {
                println!("  Grid: {:?}", grid);
            }
        }
    }

    Ok(())
}
