//! Analytics module
//!
//! Performance metrics for finished runs and comparison across runs

mod performance;
mod report;

pub use performance::{
    annualized_volatility, cagr, max_drawdown, period_returns, profitable_trades, sharpe_ratio,
    PerformanceAnalyzer, PerformanceMetrics, SimulationResult,
};
pub use report::StrategyComparison;
