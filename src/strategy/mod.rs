//! Strategy module
//!
//! Strategies turn a date, the current portfolio, and the eligible universe
//! into an ordered list of trade intents. Each variant is deterministic for
//! identical port data.

mod asset_allocation;
mod config;
mod equal_weight;
mod low_volatility;
mod momentum;
mod multi_factor;
mod rebalance;
mod sector_rotation;
mod value;

pub use asset_allocation::AssetAllocationStrategy;
pub use config::{
    AllocationWeighting, AssetAllocationConfig, LowVolatilityConfig, MomentumConfig,
    MultiFactorConfig, SectorRotationConfig, StrategyConfig, ValueConfig,
};
pub use equal_weight::EqualWeightStrategy;
pub use low_volatility::LowVolatilityStrategy;
pub use momentum::MomentumStrategy;
pub use multi_factor::MultiFactorStrategy;
pub use sector_rotation::SectorRotationStrategy;
pub use value::ValueStrategy;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::engine::SimulationId;
use crate::execution::TradeOrder;
use crate::portfolio::Portfolio;
use crate::ports::{MarketPorts, ResultSink};

/// Trait for strategy implementations
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Orders to execute, in execution order
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder>;

    /// Strategy name recorded on results
    fn name(&self) -> &'static str;
}

/// Where strategies record their intermediate rankings for audit
#[derive(Clone)]
pub struct AuditTrail {
    pub simulation_id: SimulationId,
    pub sink: Arc<dyn ResultSink>,
}

/// Create a strategy from configuration
pub fn create_strategy(
    config: &StrategyConfig,
    ports: &MarketPorts,
    audit: Option<AuditTrail>,
) -> Box<dyn Strategy> {
    match config {
        StrategyConfig::EqualWeight => Box::new(EqualWeightStrategy::new(ports.prices.clone())),
        StrategyConfig::Momentum(c) => {
            Box::new(MomentumStrategy::new(ports.prices.clone(), c.top_n))
        }
        StrategyConfig::LowVolatility(c) => Box::new(LowVolatilityStrategy::new(
            ports.prices.clone(),
            c.top_n,
            c.window,
        )),
        StrategyConfig::Value(c) => Box::new(ValueStrategy::new(
            ports.prices.clone(),
            ports.fundamentals.clone(),
            c.clone(),
        )),
        StrategyConfig::MultiFactor(c) => {
            let audit = if c.persist_scores { audit } else { None };
            Box::new(MultiFactorStrategy::new(ports.clone(), c.clone(), audit))
        }
        StrategyConfig::SectorRotation(c) => {
            Box::new(SectorRotationStrategy::new(ports.clone(), c.clone(), audit))
        }
        StrategyConfig::AssetAllocation(c) => Box::new(AssetAllocationStrategy::new(
            ports.prices.clone(),
            c.clone(),
        )),
    }
}
