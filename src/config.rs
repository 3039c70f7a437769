//! Configuration types for equity-backtest

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::RebalancingPeriod;
use crate::ports::UniverseCriteria;
use crate::strategy::StrategyConfig;
use crate::telemetry::LogFormat;

/// Allowed deviation of a weight vector's sum from 1
pub const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.001);

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is outside its permitted range
    #[error("Invalid config: {0}")]
    Invalid(String),
    /// Strategy weights do not sum to 1
    #[error("Weights must sum to 1 (got {0})")]
    WeightSum(Decimal),
    /// Grid search requested for a strategy without tunable parameters
    #[error("Strategy {0} has no tunable parameters")]
    NotTunable(&'static str),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub grid_search: Option<GridSearchConfig>,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port when set
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

/// Engine resource limits
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on concurrently executing simulation runs
    #[serde(default)]
    pub max_concurrent_runs: Option<usize>,
}

impl EngineConfig {
    /// Effective concurrency bound; defaults to the CPU count
    pub fn worker_limit(&self) -> usize {
        match self.max_concurrent_runs {
            Some(limit) => limit.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Slippage model selection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SlippageConfig {
    #[default]
    None,
    Fixed {
        #[serde(default = "default_fixed_slippage_rate")]
        rate: Decimal,
    },
    VolumeBased {
        #[serde(default = "default_base_slippage_rate")]
        base_rate: Decimal,
        #[serde(default = "default_slippage_penalty_rate")]
        penalty_rate: Decimal,
        /// Orders above this many shares pay the penalty
        #[serde(default = "default_volume_threshold")]
        threshold: u64,
    },
}

fn default_fixed_slippage_rate() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}
fn default_base_slippage_rate() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}
fn default_slippage_penalty_rate() -> Decimal {
    Decimal::new(5, 3) // 0.5%
}
fn default_volume_threshold() -> u64 {
    1000
}

/// A complete, self-contained simulation definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: Decimal,
    pub rebalancing_period: RebalancingPeriod,
    /// Brokerage fee on both sides
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Transaction tax on sells
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub slippage: SlippageConfig,
    /// Maximum position value as a fraction of total portfolio value
    #[serde(default)]
    pub max_weight_per_stock: Option<Decimal>,
    #[serde(default)]
    pub universe: UniverseCriteria,
    pub strategy: StrategyConfig,
    /// Set on configs derived by grid search
    #[serde(default)]
    pub is_optimized: bool,
}

fn default_fee_rate() -> Decimal {
    Decimal::new(15, 5) // 0.015%
}
fn default_tax_rate() -> Decimal {
    Decimal::new(23, 4) // 0.23%
}

fn check_rate(name: &str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1] (got {value})"
        )));
    }
    Ok(())
}

impl SimulationConfig {
    /// Reject configs that cannot start a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date > self.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "initial_capital must be positive".to_string(),
            ));
        }

        check_rate("fee_rate", self.fee_rate)?;
        check_rate("tax_rate", self.tax_rate)?;
        if self.fee_rate + self.tax_rate >= Decimal::ONE {
            return Err(ConfigError::Invalid(
                "fee_rate + tax_rate must be below 1".to_string(),
            ));
        }

        match &self.slippage {
            SlippageConfig::None => {}
            SlippageConfig::Fixed { rate } => check_rate("slippage.rate", *rate)?,
            SlippageConfig::VolumeBased {
                base_rate,
                penalty_rate,
                ..
            } => {
                check_rate("slippage.base_rate", *base_rate)?;
                check_rate("slippage.penalty_rate", *penalty_rate)?;
                check_rate("slippage.base_rate + penalty_rate", *base_rate + *penalty_rate)?;
            }
        }

        if let Some(cap) = self.max_weight_per_stock {
            if cap <= Decimal::ZERO || cap > Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "max_weight_per_stock must be within (0, 1] (got {cap})"
                )));
            }
        }

        self.strategy.validate()
    }

    /// Calendar days spanned, inclusive of neither end
    pub fn elapsed_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Grid-search parameter ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchConfig {
    #[serde(default = "default_min_top_n")]
    pub min_top_n: usize,
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,
    #[serde(default = "default_step_top_n")]
    pub step_top_n: usize,
    /// Step of the weight simplex; weights stay fixed when absent
    #[serde(default)]
    pub weight_step: Option<Decimal>,
}

fn default_min_top_n() -> usize {
    10
}
fn default_max_top_n() -> usize {
    30
}
fn default_step_top_n() -> usize {
    10
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            min_top_n: default_min_top_n(),
            max_top_n: default_max_top_n(),
            step_top_n: default_step_top_n(),
            weight_step: None,
        }
    }
}

impl GridSearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_top_n == 0 || self.min_top_n > self.max_top_n {
            return Err(ConfigError::Invalid(format!(
                "top-N range {}..={} is empty",
                self.min_top_n, self.max_top_n
            )));
        }
        if self.step_top_n == 0 {
            return Err(ConfigError::Invalid("step_top_n must be positive".to_string()));
        }
        if let Some(step) = self.weight_step {
            if step <= Decimal::ZERO || step > Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "weight_step must be within (0, 1] (got {step})"
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
