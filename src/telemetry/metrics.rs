//! Prometheus metrics

use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Run moved to RUNNING
    SimulationStarted,
    /// Run reached COMPLETED
    SimulationCompleted,
    /// Run reached FAILED, including cancellations
    SimulationFailed,
    /// Strategy invoked on a rebalancing date
    Rebalance,
    /// A port lookup failed and the affected step was skipped
    SkippedLookup,
    BuyTrade,
    SellTrade,
}

impl CounterMetric {
    fn name(&self) -> &'static str {
        match self {
            CounterMetric::SimulationStarted => "backtest_simulations_started_total",
            CounterMetric::SimulationCompleted => "backtest_simulations_completed_total",
            CounterMetric::SimulationFailed => "backtest_simulations_failed_total",
            CounterMetric::Rebalance => "backtest_rebalances_total",
            CounterMetric::SkippedLookup => "backtest_skipped_lookups_total",
            CounterMetric::BuyTrade => "backtest_buy_trades_total",
            CounterMetric::SellTrade => "backtest_sell_trades_total",
        }
    }
}

const ACTIVE_RUNS: &str = "backtest_active_runs";
const RUN_DURATION: &str = "backtest_run_duration_seconds";

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    let name = metric.name();
    metrics::counter!(name).increment(1);
    tracing::trace!(metric = name, "Counter incremented");
}

/// Track the number of runs currently executing
pub fn adjust_active_runs(delta: f64) {
    metrics::gauge!(ACTIVE_RUNS).increment(delta);
}

/// Record the wall-clock duration of a finished run
pub fn record_run_duration(strategy: &'static str, duration: Duration) {
    metrics::histogram!(RUN_DURATION, "strategy" => strategy).record(duration.as_secs_f64());
    tracing::debug!(
        metric = RUN_DURATION,
        strategy,
        value_ms = duration.as_millis() as u64,
        "Recording run duration"
    );
}
