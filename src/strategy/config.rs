//! Strategy selection and parameters

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, WEIGHT_SUM_TOLERANCE};

/// Active strategy and its parameters, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    EqualWeight,
    Momentum(MomentumConfig),
    LowVolatility(LowVolatilityConfig),
    Value(ValueConfig),
    MultiFactor(MultiFactorConfig),
    SectorRotation(SectorRotationConfig),
    AssetAllocation(AssetAllocationConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub top_n: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self { top_n: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowVolatilityConfig {
    pub top_n: usize,
    /// Number of daily returns in the volatility window
    pub window: usize,
}

impl Default for LowVolatilityConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            window: 60,
        }
    }
}

/// Value strategy weights on 1/PER, 1/PBR, and ROE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueConfig {
    pub top_n: usize,
    pub per_weight: Decimal,
    pub pbr_weight: Decimal,
    pub roe_weight: Decimal,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            per_weight: dec!(0.3),
            pbr_weight: dec!(0.3),
            roe_weight: dec!(0.4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiFactorConfig {
    pub top_n: usize,
    pub value_weight: Decimal,
    pub momentum_weight: Decimal,
    pub quality_weight: Decimal,
    /// Persist each rebalance's factor scores through the result sink
    pub persist_scores: bool,
}

impl Default for MultiFactorConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            value_weight: dec!(0.4),
            momentum_weight: dec!(0.3),
            quality_weight: dec!(0.3),
            persist_scores: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorRotationConfig {
    pub top_sectors: usize,
    pub stocks_per_sector: usize,
}

impl Default for SectorRotationConfig {
    fn default() -> Self {
        Self {
            top_sectors: 3,
            stocks_per_sector: 5,
        }
    }
}

/// How the risk-asset allocation is split across the universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationWeighting {
    #[default]
    Equal,
    /// Inverse of the band-width volatility proxy
    RiskParity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetAllocationConfig {
    pub max_risk_asset_weight: Decimal,
    /// Go to cash when average universe momentum is negative
    pub dual_momentum: bool,
    pub weighting: AllocationWeighting,
}

impl Default for AssetAllocationConfig {
    fn default() -> Self {
        Self {
            max_risk_asset_weight: Decimal::ONE,
            dual_momentum: true,
            weighting: AllocationWeighting::Equal,
        }
    }
}

fn check_weights(weights: &[(&str, Decimal)]) -> Result<(), ConfigError> {
    for (name, weight) in weights {
        if *weight < Decimal::ZERO || *weight > Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "{name} must be within [0, 1] (got {weight})"
            )));
        }
    }
    let sum: Decimal = weights.iter().map(|(_, w)| *w).sum();
    if (sum - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigError::WeightSum(sum));
    }
    Ok(())
}

fn check_positive(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
    }
    Ok(())
}

impl StrategyConfig {
    /// Strategy name recorded on results
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::EqualWeight => "equal_weight",
            StrategyConfig::Momentum(_) => "momentum",
            StrategyConfig::LowVolatility(_) => "low_volatility",
            StrategyConfig::Value(_) => "value",
            StrategyConfig::MultiFactor(_) => "multi_factor",
            StrategyConfig::SectorRotation(_) => "sector_rotation",
            StrategyConfig::AssetAllocation(_) => "asset_allocation",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StrategyConfig::EqualWeight => Ok(()),
            StrategyConfig::Momentum(c) => check_positive("top_n", c.top_n),
            StrategyConfig::LowVolatility(c) => {
                check_positive("top_n", c.top_n)?;
                if c.window < 2 {
                    return Err(ConfigError::Invalid("window must be at least 2".to_string()));
                }
                Ok(())
            }
            StrategyConfig::Value(c) => {
                check_positive("top_n", c.top_n)?;
                check_weights(&[
                    ("per_weight", c.per_weight),
                    ("pbr_weight", c.pbr_weight),
                    ("roe_weight", c.roe_weight),
                ])
            }
            StrategyConfig::MultiFactor(c) => {
                check_positive("top_n", c.top_n)?;
                check_weights(&[
                    ("value_weight", c.value_weight),
                    ("momentum_weight", c.momentum_weight),
                    ("quality_weight", c.quality_weight),
                ])
            }
            StrategyConfig::SectorRotation(c) => {
                check_positive("top_sectors", c.top_sectors)?;
                check_positive("stocks_per_sector", c.stocks_per_sector)
            }
            StrategyConfig::AssetAllocation(c) => {
                let w = c.max_risk_asset_weight;
                if w < Decimal::ZERO || w > Decimal::ONE {
                    return Err(ConfigError::Invalid(format!(
                        "max_risk_asset_weight must be within [0, 1] (got {w})"
                    )));
                }
                Ok(())
            }
        }
    }
}
