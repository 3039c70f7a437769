//! Performance metrics over a run's snapshot series and trade log

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::config::SimulationConfig;
use crate::engine::SimulationId;
use crate::execution::{Side, TradeRecord};
use crate::factor::stats::{mean, population_std};
use crate::portfolio::{round_currency, round_ratio, PortfolioSnapshot};

/// Trading days per year used for annualisation
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics for one simulation
///
/// Returns, drawdown, and win rate are ratios; volatility is in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub final_value: Decimal,
    pub total_return: Decimal,
    pub cagr: Decimal,
    pub max_drawdown: Decimal,
    pub sharpe_ratio: Decimal,
    pub volatility: Decimal,
    pub win_rate: Decimal,
    /// Buy/sell pairs
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
}

/// Stored outcome of a completed simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub simulation_id: SimulationId,
    pub strategy: String,
    pub slippage_model: String,
    pub is_optimized: bool,
    pub initial_capital: Decimal,
    pub metrics: PerformanceMetrics,
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Largest peak-to-trough decline, as a ratio of the running peak
pub fn max_drawdown(values: &[Decimal]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for value in values {
        if *value > peak {
            peak = *value;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - value) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Period returns between consecutive values; pairs starting at zero are skipped
pub fn period_returns(values: &[Decimal]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > Decimal::ZERO)
        .filter_map(|w| ((w[1] - w[0]) / w[0]).to_f64())
        .collect()
}

/// Annualised Sharpe ratio with a zero risk-free rate; 0 when returns do not vary
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std = population_std(returns);
    if std == 0.0 {
        return 0.0;
    }
    mean(returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualised volatility in percent
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    population_std(returns) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
}

/// Compound annual growth rate; 0 when the period has no length
pub fn cagr(initial: Decimal, final_value: Decimal, days: i64) -> f64 {
    if days <= 0 || initial <= Decimal::ZERO {
        return 0.0;
    }
    let growth = (final_value / initial).to_f64().unwrap_or(0.0);
    growth.powf(365.0 / days as f64) - 1.0
}

/// Sells matched FIFO against the oldest open buy of the same stock; a pair
/// is profitable when the sell price exceeds the buy price
pub fn profitable_trades(trades: &[TradeRecord]) -> usize {
    let mut open_buys: HashMap<&str, VecDeque<&TradeRecord>> = HashMap::new();
    let mut ordered: Vec<&TradeRecord> = trades.iter().collect();
    ordered.sort_by_key(|t| t.date);

    let mut profitable = 0;
    for trade in ordered {
        let queue = open_buys.entry(trade.stock_code.as_str()).or_default();
        match trade.side {
            Side::Buy => queue.push_back(trade),
            Side::Sell => {
                if let Some(buy) = queue.pop_front() {
                    let matched = trade.quantity.min(buy.quantity);
                    let profit =
                        (trade.execution_price - buy.execution_price) * Decimal::from(matched);
                    if profit > Decimal::ZERO {
                        profitable += 1;
                    }
                }
            }
        }
    }
    profitable
}

/// Derives summary metrics from one run's history
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// `snapshots` must be ordered by date
    pub fn analyze(
        config: &SimulationConfig,
        snapshots: &[PortfolioSnapshot],
        trades: &[TradeRecord],
    ) -> PerformanceMetrics {
        let initial = config.initial_capital;
        let final_value = snapshots.last().map_or(initial, |s| s.total_value);
        let values: Vec<Decimal> = snapshots.iter().map(|s| s.total_value).collect();
        let returns = period_returns(&values);

        let total_return = if initial > Decimal::ZERO {
            (final_value - initial) / initial
        } else {
            Decimal::ZERO
        };

        let buy_trades = trades.iter().filter(|t| t.side == Side::Buy).count();
        let sell_trades = trades.len() - buy_trades;
        let total_trades = trades.len() / 2;
        let profitable = profitable_trades(trades);
        let win_rate = if total_trades > 0 {
            Decimal::from(profitable) / Decimal::from(total_trades)
        } else {
            Decimal::ZERO
        };

        PerformanceMetrics {
            final_value: round_currency(final_value),
            total_return: round_ratio(total_return),
            cagr: round_ratio(to_decimal(cagr(initial, final_value, config.elapsed_days()))),
            max_drawdown: round_ratio(max_drawdown(&values)),
            sharpe_ratio: round_ratio(to_decimal(sharpe_ratio(&returns))),
            volatility: round_ratio(to_decimal(annualized_volatility(&returns))),
            win_rate: round_ratio(win_rate),
            total_trades,
            profitable_trades: profitable,
            buy_trades,
            sell_trades,
        }
    }
}
