//! Bounded concurrent execution of grid-search runs

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::analytics::SimulationResult;
use crate::config::SimulationConfig;
use crate::engine::{EngineError, RunControl, SimulationEngine, SimulationId};

/// One registered run waiting to execute
#[derive(Clone)]
pub struct GridJob {
    pub simulation_id: SimulationId,
    pub config: SimulationConfig,
    pub control: RunControl,
}

/// Outcome of one grid run
#[derive(Debug)]
pub struct GridOutcome {
    pub simulation_id: SimulationId,
    pub result: Result<SimulationResult, EngineError>,
}

/// Runs independent simulations with at most `limit` in flight.
///
/// Each run owns its portfolio; a failed run never stops the others.
#[derive(Clone)]
pub struct GridSearchOrchestrator {
    engine: SimulationEngine,
    limit: usize,
}

impl GridSearchOrchestrator {
    pub fn new(engine: SimulationEngine, limit: usize) -> Self {
        Self {
            engine,
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Execute every job and wait for all of them; outcomes keep job order
    pub async fn execute(&self, jobs: Vec<GridJob>) -> Vec<GridOutcome> {
        let total = jobs.len();
        tracing::info!(runs = total, limit = self.limit, "Grid search started");

        let permits = Arc::new(Semaphore::new(self.limit));
        let mut handles = Vec::with_capacity(total);
        for job in jobs {
            let engine = self.engine.clone();
            let permits = permits.clone();
            let id = job.simulation_id;
            let handle = tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                engine.run(job.simulation_id, &job.config, &job.control).await
            });
            handles.push((id, handle));
        }

        let mut outcomes = Vec::with_capacity(total);
        for (simulation_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let error = EngineError::Failure(format!("run task aborted: {e}"));
                    self.engine.mark_failed(simulation_id, &error).await;
                    Err(error)
                }
            };
            if let Err(e) = &result {
                tracing::warn!(%simulation_id, error = %e, "Grid run failed");
            }
            outcomes.push(GridOutcome {
                simulation_id,
                result,
            });
        }

        let completed = outcomes.iter().filter(|o| o.result.is_ok()).count();
        tracing::info!(
            runs = total,
            completed,
            failed = total - completed,
            "Grid search finished"
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryMarketData, InMemoryStore};
    use crate::engine::SimulationStatus;
    use crate::ports::{MarketPorts, ResultQuery, ResultSink};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn config(top_n: usize) -> SimulationConfig {
        toml::from_str(&format!(
            r#"
            start_date = "2024-03-04"
            end_date = "2024-03-08"
            initial_capital = 100000
            rebalancing_period = "daily"

            [strategy]
            type = "momentum"
            top_n = {top_n}
            "#
        ))
        .unwrap()
    }

    async fn jobs(store: &InMemoryStore, count: usize) -> Vec<GridJob> {
        let mut jobs = Vec::new();
        for i in 0..count {
            let id = Uuid::new_v4();
            let config = config(i + 1);
            store.register(id, &config).await.unwrap();
            jobs.push(GridJob {
                simulation_id: id,
                config,
                control: RunControl::new(),
            });
        }
        jobs
    }

    fn orchestrator(store: Arc<InMemoryStore>, limit: usize) -> GridSearchOrchestrator {
        let mut data = InMemoryMarketData::new();
        data.add_close("A", NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), dec!(100));
        let engine = SimulationEngine::new(MarketPorts::from_source(Arc::new(data)), store);
        GridSearchOrchestrator::new(engine, limit)
    }

    #[tokio::test]
    async fn test_all_runs_complete_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let jobs = jobs(&store, 5).await;
        let ids: Vec<_> = jobs.iter().map(|j| j.simulation_id).collect();

        let outcomes = orchestrator(store.clone(), 2).execute(jobs).await;
        assert_eq!(outcomes.iter().map(|o| o.simulation_id).collect::<Vec<_>>(), ids);
        for outcome in &outcomes {
            assert!(outcome.result.is_ok());
            let record = store.record(outcome.simulation_id).await.unwrap().unwrap();
            assert_eq!(record.status, SimulationStatus::Completed);
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let store = Arc::new(InMemoryStore::new());
        let mut jobs = jobs(&store, 3).await;
        // never registered, so its status update is rejected
        jobs[1].simulation_id = Uuid::new_v4();

        let outcomes = orchestrator(store, 1).execute(jobs).await;
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_job_fails_without_blocking_others() {
        let store = Arc::new(InMemoryStore::new());
        let jobs = jobs(&store, 2).await;
        jobs[0].control.cancel();
        let cancelled = jobs[0].simulation_id;

        let outcomes = orchestrator(store.clone(), 4).execute(jobs).await;
        assert!(matches!(outcomes[0].result, Err(EngineError::Cancelled)));
        assert!(outcomes[1].result.is_ok());
        let record = store.record(cancelled).await.unwrap().unwrap();
        assert_eq!(record.status, SimulationStatus::Failed);
    }

    #[test]
    fn test_limit_is_at_least_one() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(orchestrator(store, 0).limit(), 1);
    }
}
