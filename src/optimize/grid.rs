//! Grid-search parameter enumeration
//!
//! Expands a base config into one independent config per parameter
//! combination. Weight vectors are walked on a two-dimensional simplex with
//! exact decimal steps; the third weight is the remainder to 1.

use rust_decimal::Decimal;

use crate::config::{ConfigError, GridSearchConfig, SimulationConfig, WEIGHT_SUM_TOLERANCE};
use crate::strategy::StrategyConfig;

/// `min..=max` by `step`
pub fn top_n_values(ranges: &GridSearchConfig) -> Vec<usize> {
    (ranges.min_top_n..=ranges.max_top_n)
        .step_by(ranges.step_top_n.max(1))
        .collect()
}

/// Weight triples `(a, b, 1 - a - b)` with `a` and `b` on the step lattice.
///
/// Remainders below zero by no more than the tolerance are clipped to zero;
/// larger deficits are skipped.
pub fn weight_simplex(step: Decimal) -> Vec<[Decimal; 3]> {
    let mut triples = Vec::new();
    if step <= Decimal::ZERO {
        return triples;
    }

    let mut a = Decimal::ZERO;
    while a <= Decimal::ONE {
        let mut b = Decimal::ZERO;
        while a + b <= Decimal::ONE + WEIGHT_SUM_TOLERANCE {
            let rest = Decimal::ONE - a - b;
            if rest >= -WEIGHT_SUM_TOLERANCE && b <= Decimal::ONE {
                triples.push([a, b, rest.max(Decimal::ZERO)]);
            }
            b += step;
        }
        a += step;
    }
    triples
}

/// Substitute one combination into a copy of the base strategy config
fn with_parameters(base: &StrategyConfig, top_n: usize, weights: Option<[Decimal; 3]>) -> StrategyConfig {
    let mut strategy = base.clone();
    match &mut strategy {
        StrategyConfig::Momentum(c) => c.top_n = top_n,
        StrategyConfig::LowVolatility(c) => c.top_n = top_n,
        StrategyConfig::SectorRotation(c) => c.stocks_per_sector = top_n,
        StrategyConfig::Value(c) => {
            c.top_n = top_n;
            if let Some([per, pbr, roe]) = weights {
                c.per_weight = per;
                c.pbr_weight = pbr;
                c.roe_weight = roe;
            }
        }
        StrategyConfig::MultiFactor(c) => {
            c.top_n = top_n;
            if let Some([value, momentum, quality]) = weights {
                c.value_weight = value;
                c.momentum_weight = momentum;
                c.quality_weight = quality;
            }
        }
        StrategyConfig::EqualWeight | StrategyConfig::AssetAllocation(_) => {}
    }
    strategy
}

/// One validated config per parameter combination, each tagged optimized.
///
/// Fails when the base config or the ranges are invalid, or when the
/// strategy has nothing to tune. Combinations that fail validation are
/// dropped.
pub fn expand_grid(
    base: &SimulationConfig,
    ranges: &GridSearchConfig,
) -> Result<Vec<SimulationConfig>, ConfigError> {
    base.validate()?;
    ranges.validate()?;

    let weighted = match &base.strategy {
        StrategyConfig::EqualWeight | StrategyConfig::AssetAllocation(_) => {
            return Err(ConfigError::NotTunable(base.strategy.name()));
        }
        StrategyConfig::Value(_) | StrategyConfig::MultiFactor(_) => true,
        _ => false,
    };

    let weight_sets: Vec<Option<[Decimal; 3]>> = match ranges.weight_step {
        Some(step) if weighted => weight_simplex(step).into_iter().map(Some).collect(),
        _ => vec![None],
    };

    let mut configs = Vec::new();
    for top_n in top_n_values(ranges) {
        for weights in &weight_sets {
            let mut config = base.clone();
            config.strategy = with_parameters(&base.strategy, top_n, *weights);
            config.is_optimized = true;
            match config.validate() {
                Ok(()) => configs.push(config),
                Err(e) => tracing::debug!(top_n, error = %e, "Skipping invalid combination"),
            }
        }
    }
    Ok(configs)
}
