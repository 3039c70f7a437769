//! Backtest service
//!
//! The surface an outer API layer drives: validates configs, registers runs,
//! launches them in the background or inline, and answers status, result,
//! and comparison queries from the result store.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::analytics::{SimulationResult, StrategyComparison};
use crate::config::{ConfigError, EngineConfig, GridSearchConfig, SimulationConfig};
use crate::engine::{EngineError, RunControl, SimulationEngine, SimulationId, SimulationStatus};
use crate::execution::TradeRecord;
use crate::factor::FactorScore;
use crate::optimize::{expand_grid, GridJob, GridOutcome, GridSearchOrchestrator};
use crate::portfolio::PortfolioSnapshot;
use crate::ports::{
    MarketPorts, ResultQuery, ResultSink, SectorAnalysis, SimulationRecord, SinkError,
};

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Unknown simulation: {0}")]
    UnknownSimulation(SimulationId),
}

type Controls = Arc<RwLock<HashMap<SimulationId, RunControl>>>;

/// Drop the cancel handles of finished grid runs
async fn release(controls: &Controls, outcomes: &[GridOutcome]) {
    let mut controls = controls.write().await;
    for outcome in outcomes {
        controls.remove(&outcome.simulation_id);
    }
}

/// Entry point for starting, cancelling, and inspecting simulations
pub struct BacktestService<S> {
    store: Arc<S>,
    engine: SimulationEngine,
    orchestrator: GridSearchOrchestrator,
    controls: Controls,
}

impl<S> BacktestService<S>
where
    S: ResultSink + ResultQuery + 'static,
{
    pub fn new(ports: MarketPorts, store: Arc<S>, engine_config: &EngineConfig) -> Self {
        let sink: Arc<dyn ResultSink> = store.clone();
        let engine = SimulationEngine::new(ports, sink);
        let orchestrator = GridSearchOrchestrator::new(engine.clone(), engine_config.worker_limit());
        Self {
            store,
            engine,
            orchestrator,
            controls: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a run in PENDING state with a fresh cancel handle
    async fn register(&self, config: &SimulationConfig) -> Result<(SimulationId, RunControl), ServiceError> {
        let id = Uuid::new_v4();
        self.store.register(id, config).await?;
        let control = RunControl::new();
        self.controls.write().await.insert(id, control.clone());
        Ok((id, control))
    }

    /// Start a run in the background and return its id immediately
    pub async fn start_simulation(&self, config: SimulationConfig) -> Result<SimulationId, ServiceError> {
        config.validate()?;
        let (id, control) = self.register(&config).await?;

        let engine = self.engine.clone();
        let controls = self.controls.clone();
        tokio::spawn(async move {
            // Outcome is recorded in the store
            let _ = engine.run(id, &config, &control).await;
            controls.write().await.remove(&id);
        });

        tracing::info!(simulation_id = %id, "Simulation submitted");
        Ok(id)
    }

    /// Run a simulation to completion and return its result
    pub async fn run_simulation(&self, config: SimulationConfig) -> Result<SimulationResult, ServiceError> {
        config.validate()?;
        let (id, control) = self.register(&config).await?;
        let outcome = self.engine.run(id, &config, &control).await;
        self.controls.write().await.remove(&id);
        Ok(outcome?)
    }

    async fn register_grid(
        &self,
        base: &SimulationConfig,
        ranges: &GridSearchConfig,
    ) -> Result<Vec<GridJob>, ServiceError> {
        let configs = expand_grid(base, ranges)?;
        let mut jobs = Vec::with_capacity(configs.len());
        for config in configs {
            match self.register(&config).await {
                Ok((simulation_id, control)) => jobs.push(GridJob {
                    simulation_id,
                    config,
                    control,
                }),
                Err(e) => {
                    self.abandon(&jobs, &e).await;
                    return Err(e);
                }
            }
        }
        Ok(jobs)
    }

    /// Fail runs registered by a grid search that could not be fully registered
    async fn abandon(&self, jobs: &[GridJob], cause: &ServiceError) {
        let message = format!("Grid search registration aborted: {cause}");
        let mut controls = self.controls.write().await;
        for job in jobs {
            controls.remove(&job.simulation_id);
            if let Err(e) = self
                .store
                .update_status(job.simulation_id, SimulationStatus::Failed, Some(message.clone()))
                .await
            {
                tracing::error!(simulation_id = %job.simulation_id, error = %e, "Failed to abandon grid run");
            }
        }
        tracing::warn!(abandoned = jobs.len(), error = %cause, "Grid search registration failed");
    }

    /// Register every grid combination and run them in the background
    pub async fn start_grid_search(
        &self,
        base: &SimulationConfig,
        ranges: &GridSearchConfig,
    ) -> Result<Vec<SimulationId>, ServiceError> {
        let jobs = self.register_grid(base, ranges).await?;
        let ids = jobs.iter().map(|j| j.simulation_id).collect();

        let orchestrator = self.orchestrator.clone();
        let controls = self.controls.clone();
        tokio::spawn(async move {
            let outcomes = orchestrator.execute(jobs).await;
            release(&controls, &outcomes).await;
        });
        Ok(ids)
    }

    /// Run every grid combination and wait for all of them
    pub async fn run_grid_search(
        &self,
        base: &SimulationConfig,
        ranges: &GridSearchConfig,
    ) -> Result<Vec<GridOutcome>, ServiceError> {
        let jobs = self.register_grid(base, ranges).await?;
        let outcomes = self.orchestrator.execute(jobs).await;
        release(&self.controls, &outcomes).await;
        Ok(outcomes)
    }

    /// Request cancellation; `false` when the run has already finished
    pub async fn cancel(&self, id: SimulationId) -> Result<bool, ServiceError> {
        if let Some(control) = self.controls.read().await.get(&id) {
            control.cancel();
            tracing::info!(simulation_id = %id, "Cancellation requested");
            return Ok(true);
        }
        self.get_status(id).await.map(|_| false)
    }

    pub async fn get_status(&self, id: SimulationId) -> Result<SimulationRecord, ServiceError> {
        self.store
            .record(id)
            .await?
            .ok_or(ServiceError::UnknownSimulation(id))
    }

    /// Result of a COMPLETED run; `None` while pending, running, or failed
    pub async fn get_result(&self, id: SimulationId) -> Result<Option<SimulationResult>, ServiceError> {
        self.get_status(id).await?;
        Ok(self.store.result(id).await?)
    }

    pub async fn get_snapshots(
        &self,
        id: SimulationId,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<PortfolioSnapshot>, ServiceError> {
        self.get_status(id).await?;
        Ok(self.store.snapshots(id, range).await?)
    }

    pub async fn get_trades(&self, id: SimulationId) -> Result<Vec<TradeRecord>, ServiceError> {
        self.get_status(id).await?;
        Ok(self.store.trades(id).await?)
    }

    pub async fn get_factor_scores(&self, id: SimulationId) -> Result<Vec<FactorScore>, ServiceError> {
        self.get_status(id).await?;
        Ok(self.store.factor_scores(id).await?)
    }

    pub async fn get_sector_analyses(
        &self,
        id: SimulationId,
    ) -> Result<Vec<SectorAnalysis>, ServiceError> {
        self.get_status(id).await?;
        Ok(self.store.sector_analyses(id).await?)
    }

    /// Best-by-CAGR, best-by-Sharpe, and lowest-MDD among completed runs.
    ///
    /// Runs without a result are left out of the comparison.
    pub async fn compare(&self, ids: &[SimulationId]) -> Result<StrategyComparison, ServiceError> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.result(*id).await? {
                Some(result) => results.push(result),
                None => tracing::warn!(simulation_id = %id, "No result to compare"),
            }
        }
        Ok(StrategyComparison::from_results(&results))
    }
}
