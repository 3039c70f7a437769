//! Slippage models
//!
//! Map a quoted price, order size, and side to an execution price.
//! Buys fill above the quote and sells below it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::Side;
use crate::config::SlippageConfig;
use crate::portfolio::round_currency;

/// Trait for slippage model implementations
pub trait SlippageModel: Send + Sync {
    /// Slippage-adjusted execution price, 2 dp
    fn execution_price(&self, quoted: Decimal, quantity: u64, side: Side) -> Decimal;

    /// Model name recorded on results
    fn name(&self) -> &'static str;
}

fn apply_rate(quoted: Decimal, rate: Decimal, side: Side) -> Decimal {
    let factor = match side {
        Side::Buy => Decimal::ONE + rate,
        Side::Sell => Decimal::ONE - rate,
    };
    round_currency(quoted * factor)
}

/// Fills at the quoted price
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSlippage;

impl SlippageModel for NoSlippage {
    fn execution_price(&self, quoted: Decimal, _quantity: u64, _side: Side) -> Decimal {
        quoted
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Constant proportional slippage
#[derive(Debug, Clone)]
pub struct FixedSlippage {
    /// Fraction of price, e.g. 0.002 = 0.2%
    pub rate: Decimal,
}

impl FixedSlippage {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

impl Default for FixedSlippage {
    fn default() -> Self {
        Self { rate: dec!(0.001) }
    }
}

impl SlippageModel for FixedSlippage {
    fn execution_price(&self, quoted: Decimal, _quantity: u64, side: Side) -> Decimal {
        apply_rate(quoted, self.rate, side)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Proportional slippage with a penalty for large orders
///
/// Orders strictly above `threshold` shares pay `base_rate + penalty_rate`.
#[derive(Debug, Clone)]
pub struct VolumeBasedSlippage {
    pub base_rate: Decimal,
    pub penalty_rate: Decimal,
    pub threshold: u64,
}

impl VolumeBasedSlippage {
    pub fn new(base_rate: Decimal, penalty_rate: Decimal, threshold: u64) -> Self {
        Self {
            base_rate,
            penalty_rate,
            threshold,
        }
    }

    /// Effective rate for an order of `quantity` shares
    pub fn rate_for(&self, quantity: u64) -> Decimal {
        if quantity > self.threshold {
            self.base_rate + self.penalty_rate
        } else {
            self.base_rate
        }
    }
}

impl Default for VolumeBasedSlippage {
    fn default() -> Self {
        Self {
            base_rate: dec!(0.001),
            penalty_rate: dec!(0.005),
            threshold: 1000,
        }
    }
}

impl SlippageModel for VolumeBasedSlippage {
    fn execution_price(&self, quoted: Decimal, quantity: u64, side: Side) -> Decimal {
        apply_rate(quoted, self.rate_for(quantity), side)
    }

    fn name(&self) -> &'static str {
        "volume_based"
    }
}

/// Create a slippage model from configuration
pub fn create_slippage_model(config: &SlippageConfig) -> Box<dyn SlippageModel> {
    match config {
        SlippageConfig::None => Box::new(NoSlippage),
        SlippageConfig::Fixed { rate } => Box::new(FixedSlippage::new(*rate)),
        SlippageConfig::VolumeBased {
            base_rate,
            penalty_rate,
            threshold,
        } => Box::new(VolumeBasedSlippage::new(
            *base_rate,
            *penalty_rate,
            *threshold,
        )),
    }
}
