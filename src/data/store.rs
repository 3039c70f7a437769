//! In-memory result store

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::analytics::SimulationResult;
use crate::config::SimulationConfig;
use crate::engine::{SimulationId, SimulationStatus};
use crate::execution::TradeRecord;
use crate::factor::FactorScore;
use crate::portfolio::PortfolioSnapshot;
use crate::ports::{ResultQuery, ResultSink, SectorAnalysis, SimulationRecord, SinkError};

#[derive(Default)]
struct StoreState {
    records: HashMap<SimulationId, SimulationRecord>,
    results: HashMap<SimulationId, SimulationResult>,
    snapshots: HashMap<SimulationId, Vec<PortfolioSnapshot>>,
    trades: HashMap<SimulationId, Vec<TradeRecord>>,
    factor_scores: HashMap<SimulationId, Vec<FactorScore>>,
    sector_analyses: HashMap<SimulationId, Vec<SectorAnalysis>>,
}

/// Append-only result store backed by maps behind a tokio `RwLock`
///
/// Status updates are checked against the lifecycle; all other writes are
/// accepted for any id.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every registered simulation
    pub async fn simulation_ids(&self) -> Vec<SimulationId> {
        self.state.read().await.records.keys().copied().collect()
    }
}

#[async_trait]
impl ResultSink for InMemoryStore {
    async fn register(
        &self,
        id: SimulationId,
        config: &SimulationConfig,
    ) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        if state.records.contains_key(&id) {
            return Err(SinkError::Backend(format!("simulation {id} already registered")));
        }
        state.records.insert(
            id,
            SimulationRecord {
                simulation_id: id,
                config: config.clone(),
                status: SimulationStatus::Pending,
                message: None,
            },
        );
        Ok(())
    }

    async fn update_status(
        &self,
        id: SimulationId,
        status: SimulationStatus,
        message: Option<String>,
    ) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(&id)
            .ok_or(SinkError::UnknownSimulation(id))?;
        if !record.status.can_transition_to(status) {
            return Err(SinkError::IllegalTransition {
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        record.message = message;
        Ok(())
    }

    async fn save_snapshot(&self, snapshot: PortfolioSnapshot) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        state
            .snapshots
            .entry(snapshot.simulation_id)
            .or_default()
            .push(snapshot);
        Ok(())
    }

    async fn save_trade(&self, trade: TradeRecord) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        state.trades.entry(trade.simulation_id).or_default().push(trade);
        Ok(())
    }

    async fn save_result(&self, result: SimulationResult) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        if state.results.contains_key(&result.simulation_id) {
            return Err(SinkError::Backend(format!(
                "result for {} already recorded",
                result.simulation_id
            )));
        }
        state.results.insert(result.simulation_id, result);
        Ok(())
    }

    async fn save_factor_scores(
        &self,
        id: SimulationId,
        scores: &[FactorScore],
    ) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        state
            .factor_scores
            .entry(id)
            .or_default()
            .extend_from_slice(scores);
        Ok(())
    }

    async fn save_sector_analyses(
        &self,
        id: SimulationId,
        analyses: &[SectorAnalysis],
    ) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        state
            .sector_analyses
            .entry(id)
            .or_default()
            .extend_from_slice(analyses);
        Ok(())
    }
}

#[async_trait]
impl ResultQuery for InMemoryStore {
    async fn record(&self, id: SimulationId) -> Result<Option<SimulationRecord>, SinkError> {
        Ok(self.state.read().await.records.get(&id).cloned())
    }

    async fn result(&self, id: SimulationId) -> Result<Option<SimulationResult>, SinkError> {
        Ok(self.state.read().await.results.get(&id).cloned())
    }

    async fn snapshots(
        &self,
        id: SimulationId,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<PortfolioSnapshot>, SinkError> {
        let state = self.state.read().await;
        let mut snapshots: Vec<PortfolioSnapshot> = state
            .snapshots
            .get(&id)
            .map(|all| {
                all.iter()
                    .filter(|s| range.map_or(true, |(from, to)| s.date >= from && s.date <= to))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        snapshots.sort_by_key(|s| s.date);
        Ok(snapshots)
    }

    async fn trades(&self, id: SimulationId) -> Result<Vec<TradeRecord>, SinkError> {
        Ok(self
            .state
            .read()
            .await
            .trades
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn factor_scores(&self, id: SimulationId) -> Result<Vec<FactorScore>, SinkError> {
        Ok(self
            .state
            .read()
            .await
            .factor_scores
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn sector_analyses(&self, id: SimulationId) -> Result<Vec<SectorAnalysis>, SinkError> {
        Ok(self
            .state
            .read()
            .await
            .sector_analyses
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}
