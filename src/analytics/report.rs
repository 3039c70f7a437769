//! Result reporting and cross-run comparison

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::SimulationResult;
use crate::engine::SimulationId;

impl SimulationResult {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let m = &self.metrics;
        format!(
            r#"
══════════════════════════════════════════════════════
               SIMULATION RESULTS
══════════════════════════════════════════════════════
Simulation:       {}
Strategy:         {}{}
Slippage Model:   {}

PERFORMANCE
───────────────────────────────────────────────────────
Initial Capital:  {:.2}
Final Value:      {:.2}
Total Return:     {:+.2}%
CAGR:             {:+.2}%
Max Drawdown:     {:.2}%
Sharpe Ratio:     {:.2}
Volatility:       {:.2}%

ACTIVITY
───────────────────────────────────────────────────────
Total Trades:     {} ({} buys, {} sells)
Win Rate:         {:.1}% ({} profitable)
══════════════════════════════════════════════════════
"#,
            self.simulation_id,
            self.strategy,
            if self.is_optimized { " (optimized)" } else { "" },
            self.slippage_model,
            self.initial_capital,
            m.final_value,
            m.total_return * dec!(100),
            m.cagr * dec!(100),
            m.max_drawdown * dec!(100),
            m.sharpe_ratio,
            m.volatility,
            m.total_trades,
            m.buy_trades,
            m.sell_trades,
            m.win_rate * dec!(100),
            m.profitable_trades,
        )
    }
}

/// Winners across a set of completed runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub best_cagr: Option<SimulationId>,
    pub best_sharpe: Option<SimulationId>,
    pub lowest_mdd: Option<SimulationId>,
    /// Number of results compared
    pub compared: usize,
}

/// First result whose key beats every earlier one under `better`
fn pick<F>(results: &[SimulationResult], key: fn(&SimulationResult) -> Decimal, better: F) -> Option<SimulationId>
where
    F: Fn(Decimal, Decimal) -> bool,
{
    let mut best: Option<&SimulationResult> = None;
    for result in results {
        match best {
            Some(current) if !better(key(result), key(current)) => {}
            _ => best = Some(result),
        }
    }
    best.map(|r| r.simulation_id)
}

impl StrategyComparison {
    /// Ties go to the earliest result in `results`
    pub fn from_results(results: &[SimulationResult]) -> Self {
        Self {
            best_cagr: pick(results, |r| r.metrics.cagr, |a, b| a > b),
            best_sharpe: pick(results, |r| r.metrics.sharpe_ratio, |a, b| a > b),
            lowest_mdd: pick(results, |r| r.metrics.max_drawdown, |a, b| a < b),
            compared: results.len(),
        }
    }

    pub fn format_table(&self) -> String {
        let show = |id: Option<SimulationId>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
        format!(
            r#"
══════════════════════════════════════════════════════
               STRATEGY COMPARISON ({} runs)
══════════════════════════════════════════════════════
Best CAGR:        {}
Best Sharpe:      {}
Lowest MDD:       {}
══════════════════════════════════════════════════════
"#,
            self.compared,
            show(self.best_cagr),
            show(self.best_sharpe),
            show(self.lowest_mdd),
        )
    }
}
