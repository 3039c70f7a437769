//! Simulation engine
//!
//! Drives one run day by day: skips non-trading days, rebalances on schedule,
//! executes orders, revalues holdings, and persists snapshots and trades as it
//! goes so partial history survives a failure.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

use super::schedule::{is_rebalancing_date, is_snapshot_date};
use super::{EngineError, RunControl, SimulationId, SimulationStatus};
use crate::analytics::{PerformanceAnalyzer, SimulationResult};
use crate::config::SimulationConfig;
use crate::execution::{OrderExecutor, TradeRecord};
use crate::portfolio::{Portfolio, PortfolioSnapshot};
use crate::ports::{MarketPorts, ResultSink};
use crate::strategy::{create_strategy, AuditTrail, Strategy};
use crate::telemetry::{
    adjust_active_runs, increment_counter, record_run_duration, CounterMetric,
};

/// Mutable state of one run; never shared outside the run
struct RunState {
    portfolio: Portfolio,
    snapshots: Vec<PortfolioSnapshot>,
    trades: Vec<TradeRecord>,
}

/// Runs simulations against a set of market ports and a result sink
#[derive(Clone)]
pub struct SimulationEngine {
    ports: MarketPorts,
    sink: Arc<dyn ResultSink>,
}

impl SimulationEngine {
    pub fn new(ports: MarketPorts, sink: Arc<dyn ResultSink>) -> Self {
        Self { ports, sink }
    }

    /// Execute a registered PENDING simulation to completion.
    ///
    /// Moves the run to RUNNING, then to COMPLETED with the stored result, or
    /// to FAILED with the error message. Snapshots and trades written before
    /// a failure are kept.
    pub async fn run(
        &self,
        id: SimulationId,
        config: &SimulationConfig,
        control: &RunControl,
    ) -> Result<SimulationResult, EngineError> {
        if control.is_cancelled() {
            self.mark_failed(id, &EngineError::Cancelled).await;
            return Err(EngineError::Cancelled);
        }
        self.sink
            .update_status(id, SimulationStatus::Running, None)
            .await?;

        increment_counter(CounterMetric::SimulationStarted);
        adjust_active_runs(1.0);
        let started = Instant::now();
        tracing::info!(
            simulation_id = %id,
            strategy = config.strategy.name(),
            start = %config.start_date,
            end = %config.end_date,
            capital = %config.initial_capital,
            "Simulation started"
        );

        let outcome = self.simulate(id, config, control).await;
        adjust_active_runs(-1.0);
        record_run_duration(config.strategy.name(), started.elapsed());

        match outcome {
            Ok(result) => {
                self.sink
                    .update_status(id, SimulationStatus::Completed, None)
                    .await?;
                increment_counter(CounterMetric::SimulationCompleted);
                tracing::info!(
                    simulation_id = %id,
                    final_value = %result.metrics.final_value,
                    total_return = %result.metrics.total_return,
                    trades = result.metrics.total_trades,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Simulation completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.mark_failed(id, &e).await;
                Err(e)
            }
        }
    }

    /// Record a FAILED terminal state with the error as message
    pub(crate) async fn mark_failed(&self, id: SimulationId, error: &EngineError) {
        increment_counter(CounterMetric::SimulationFailed);
        match error {
            EngineError::Cancelled => tracing::info!(simulation_id = %id, "Simulation cancelled"),
            other => tracing::error!(simulation_id = %id, error = %other, "Simulation failed"),
        }
        if let Err(e) = self
            .sink
            .update_status(id, SimulationStatus::Failed, Some(error.to_string()))
            .await
        {
            tracing::error!(simulation_id = %id, error = %e, "Failed to record FAILED status");
        }
    }

    async fn simulate(
        &self,
        id: SimulationId,
        config: &SimulationConfig,
        control: &RunControl,
    ) -> Result<SimulationResult, EngineError> {
        let audit = AuditTrail {
            simulation_id: id,
            sink: self.sink.clone(),
        };
        let strategy = create_strategy(&config.strategy, &self.ports, Some(audit));
        let executor = OrderExecutor::from_config(config);
        let mut state = RunState {
            portfolio: Portfolio::new(config.initial_capital),
            snapshots: Vec::new(),
            trades: Vec::new(),
        };

        let mut date = config.start_date;
        while date <= config.end_date {
            if control.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            if !self.ports.calendar.is_non_trading_day(date).await? {
                self.trading_day(id, date, config, strategy.as_ref(), &executor, &mut state)
                    .await?;
            }

            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        let metrics = PerformanceAnalyzer::analyze(config, &state.snapshots, &state.trades);
        let result = SimulationResult {
            simulation_id: id,
            strategy: strategy.name().to_string(),
            slippage_model: executor.slippage_model_name().to_string(),
            is_optimized: config.is_optimized,
            initial_capital: config.initial_capital,
            metrics,
        };
        self.sink.save_result(result.clone()).await?;
        Ok(result)
    }

    async fn trading_day(
        &self,
        id: SimulationId,
        date: NaiveDate,
        config: &SimulationConfig,
        strategy: &dyn Strategy,
        executor: &OrderExecutor,
        state: &mut RunState,
    ) -> Result<(), EngineError> {
        if is_rebalancing_date(date, config.rebalancing_period, config.start_date) {
            self.rebalance(id, date, config, strategy, executor, state)
                .await?;
        }

        self.revalue(date, &mut state.portfolio).await;

        if is_snapshot_date(date, config.rebalancing_period, config.start_date) {
            let snapshot = state.portfolio.snapshot(id, date);
            self.sink.save_snapshot(snapshot.clone()).await?;
            state.snapshots.push(snapshot);
        }
        Ok(())
    }

    async fn rebalance(
        &self,
        id: SimulationId,
        date: NaiveDate,
        config: &SimulationConfig,
        strategy: &dyn Strategy,
        executor: &OrderExecutor,
        state: &mut RunState,
    ) -> Result<(), EngineError> {
        let universe = match self.ports.universe.filter_universe(date, &config.universe).await {
            Ok(universe) => universe,
            Err(e) => {
                increment_counter(CounterMetric::SkippedLookup);
                tracing::warn!(%date, error = %e, "Universe lookup failed, skipping rebalance");
                return Ok(());
            }
        };

        increment_counter(CounterMetric::Rebalance);
        let orders = strategy.rebalance(date, &state.portfolio, &universe).await;
        tracing::debug!(%date, universe = universe.len(), orders = orders.len(), "Rebalancing");

        for order in &orders {
            if let Some(trade) = executor.execute(id, &mut state.portfolio, order) {
                self.sink.save_trade(trade.clone()).await?;
                state.trades.push(trade);
            }
        }
        Ok(())
    }

    /// Mark every holding to today's close; missing prices keep the last mark
    async fn revalue(&self, date: NaiveDate, portfolio: &mut Portfolio) {
        for code in portfolio.held_codes() {
            match self.ports.prices.price_on(&code, date).await {
                Ok(Some(price)) => {
                    portfolio.mark(&code, price.close);
                }
                Ok(None) => {
                    tracing::trace!(%date, stock_code = %code, "No close, keeping last price");
                }
                Err(e) => {
                    increment_counter(CounterMetric::SkippedLookup);
                    tracing::warn!(%date, stock_code = %code, error = %e, "Price lookup failed, keeping last price");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryMarketData, InMemoryStore};
    use crate::ports::{PortError, ResultQuery, TradingCalendar};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn config(strategy: &str) -> SimulationConfig {
        toml::from_str(&format!(
            r#"
            start_date = "2024-01-01"
            end_date = "2024-01-31"
            initial_capital = 100000
            rebalancing_period = "weekly"
            fee_rate = 0
            tax_rate = 0

            [strategy]
            type = "{strategy}"
            "#
        ))
        .unwrap()
    }

    fn market(closes: impl Fn(u32) -> rust_decimal::Decimal) -> InMemoryMarketData {
        let mut data = InMemoryMarketData::new();
        for code in ["A", "B"] {
            data.add_profile(crate::ports::StockProfile {
                stock_code: code.to_string(),
                name: String::new(),
                market: "KOSPI".to_string(),
                sector: "Tech".to_string(),
            });
            for day in 1..=31 {
                data.add_close(code, d(1, day), closes(day));
            }
        }
        data
    }

    async fn setup(
        data: InMemoryMarketData,
        config: &SimulationConfig,
    ) -> (SimulationEngine, Arc<InMemoryStore>, SimulationId) {
        let store = Arc::new(InMemoryStore::new());
        let id = Uuid::new_v4();
        store.register(id, config).await.unwrap();
        let engine = SimulationEngine::new(MarketPorts::from_source(Arc::new(data)), store.clone());
        (engine, store, id)
    }

    #[tokio::test]
    async fn test_run_completes_and_persists() {
        let config = config("equal_weight");
        let (engine, store, id) = setup(market(|_| dec!(100)), &config).await;

        let result = engine.run(id, &config, &RunControl::new()).await.unwrap();
        assert_eq!(result.metrics.final_value, dec!(100000));
        assert_eq!(result.strategy, "equal_weight");
        assert_eq!(result.slippage_model, "none");

        let record = store.record(id).await.unwrap().unwrap();
        assert_eq!(record.status, SimulationStatus::Completed);
        assert_eq!(store.result(id).await.unwrap(), Some(result));

        // Mondays 1, 8, 15, 22, 29 plus the 31st month end
        let snapshots = store.snapshots(id, None).await.unwrap();
        let days: Vec<u32> = snapshots.iter().map(|s| chrono::Datelike::day(&s.date)).collect();
        assert_eq!(days, vec![1, 8, 15, 22, 29, 31]);
        assert!(snapshots.iter().all(|s| s.valuation_gap() <= dec!(0.01)));

        let trades = store.trades(id).await.unwrap();
        assert_eq!(trades.len(), 2);
        assert!(trades.iter().all(|t| t.quantity == 500));
    }

    #[tokio::test]
    async fn test_holdings_revalued_daily() {
        let config = config("equal_weight");
        let (engine, _store, id) =
            setup(market(|day| dec!(100) + rust_decimal::Decimal::from(day)), &config).await;

        let result = engine.run(id, &config, &RunControl::new()).await.unwrap();
        // 495 shares of each at 101 on Jan 1; later deltas stay under one share
        assert!(result.metrics.final_value > dec!(100000));
        assert_eq!(result.metrics.max_drawdown, dec!(0));
    }

    #[tokio::test]
    async fn test_failed_price_lookup_skips_stock() {
        let config = config("equal_weight");
        let mut data = market(|_| dec!(100));
        data.fail_lookups_for("B");
        let (engine, store, id) = setup(data, &config).await;

        let result = engine.run(id, &config, &RunControl::new()).await.unwrap();
        assert_eq!(
            store.record(id).await.unwrap().unwrap().status,
            SimulationStatus::Completed
        );
        // B was never bought; half the capital stays in cash
        assert_eq!(result.metrics.final_value, dec!(100000));
        let trades = store.trades(id).await.unwrap();
        assert!(trades.iter().all(|t| t.stock_code == "A"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let config = config("equal_weight");
        let (engine, store, id) = setup(market(|_| dec!(100)), &config).await;
        let control = RunControl::new();
        control.cancel();

        let err = engine.run(id, &config, &control).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        let record = store.record(id).await.unwrap().unwrap();
        assert_eq!(record.status, SimulationStatus::Failed);
        assert!(store.snapshots(id, None).await.unwrap().is_empty());
    }

    /// Calendar that errors for every date after `fails_after`
    struct FlakyCalendar {
        inner: InMemoryMarketData,
        fails_after: NaiveDate,
    }

    #[async_trait::async_trait]
    impl TradingCalendar for FlakyCalendar {
        async fn is_non_trading_day(&self, date: NaiveDate) -> Result<bool, PortError> {
            if date > self.fails_after {
                return Err(PortError::Backend("calendar offline".to_string()));
            }
            self.inner.is_non_trading_day(date).await
        }
    }

    #[tokio::test]
    async fn test_mid_run_failure_keeps_history() {
        let config = config("equal_weight");
        let data = market(|_| dec!(100));
        let mut ports = MarketPorts::from_source(Arc::new(data.clone()));
        ports.calendar = Arc::new(FlakyCalendar {
            inner: data,
            fails_after: d(1, 10),
        });
        let store = Arc::new(InMemoryStore::new());
        let id = Uuid::new_v4();
        store.register(id, &config).await.unwrap();
        let engine = SimulationEngine::new(ports, store.clone());

        let err = engine.run(id, &config, &RunControl::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Port(_)));

        let record = store.record(id).await.unwrap().unwrap();
        assert_eq!(record.status, SimulationStatus::Failed);
        assert!(record.message.unwrap().contains("calendar offline"));
        assert!(store.result(id).await.unwrap().is_none());

        // Mondays 1 and 8 were written before the failure
        let snapshots = store.snapshots(id, None).await.unwrap();
        let days: Vec<u32> = snapshots.iter().map(|s| chrono::Datelike::day(&s.date)).collect();
        assert_eq!(days, vec![1, 8]);
        assert_eq!(store.trades(id).await.unwrap().len(), 2);
    }

    /// Calendar that requests cancellation once it is asked about `cancel_on`
    struct CancellingCalendar {
        inner: InMemoryMarketData,
        control: RunControl,
        cancel_on: NaiveDate,
    }

    #[async_trait::async_trait]
    impl TradingCalendar for CancellingCalendar {
        async fn is_non_trading_day(&self, date: NaiveDate) -> Result<bool, PortError> {
            if date == self.cancel_on {
                self.control.cancel();
            }
            self.inner.is_non_trading_day(date).await
        }
    }

    #[tokio::test]
    async fn test_cancel_between_days_keeps_history() {
        let config = config("equal_weight");
        let data = market(|_| dec!(100));
        let control = RunControl::new();
        let mut ports = MarketPorts::from_source(Arc::new(data.clone()));
        ports.calendar = Arc::new(CancellingCalendar {
            inner: data,
            control: control.clone(),
            cancel_on: d(1, 15),
        });
        let store = Arc::new(InMemoryStore::new());
        let id = Uuid::new_v4();
        store.register(id, &config).await.unwrap();
        let engine = SimulationEngine::new(ports, store.clone());

        let err = engine.run(id, &config, &control).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert_eq!(
            store.record(id).await.unwrap().unwrap().status,
            SimulationStatus::Failed
        );
        assert!(store.result(id).await.unwrap().is_none());

        // the 15th itself still runs; the check fires before the 16th
        let snapshots = store.snapshots(id, None).await.unwrap();
        let days: Vec<u32> = snapshots.iter().map(|s| chrono::Datelike::day(&s.date)).collect();
        assert_eq!(days, vec![1, 8, 15]);
        assert_eq!(store.trades(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_run_is_rejected() {
        let config = config("equal_weight");
        let engine = SimulationEngine::new(
            MarketPorts::from_source(Arc::new(market(|_| dec!(100)))),
            Arc::new(InMemoryStore::new()),
        );
        let err = engine
            .run(Uuid::new_v4(), &config, &RunControl::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Sink(_)));
    }
}
