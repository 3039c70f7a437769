//! Ports module
//!
//! Narrow read ports for market data and the write/read sides of the result store.
//! The engine never talks to a data provider or database directly.

mod types;

pub use types::{
    CustomFilter, FundamentalIndicator, Price, SectorAnalysis, StockProfile, TechnicalIndicator,
    UniverseCriteria,
};

use crate::analytics::SimulationResult;
use crate::config::SimulationConfig;
use crate::engine::{SimulationId, SimulationStatus};
use crate::execution::TradeRecord;
use crate::factor::FactorScore;
use crate::portfolio::PortfolioSnapshot;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Market data lookup errors
#[derive(Debug, Error)]
pub enum PortError {
    /// Requested data does not exist for the key
    #[error("Data unavailable: {0}")]
    Unavailable(String),
    /// The backing store failed
    #[error("Port backend failure: {0}")]
    Backend(String),
}

/// Result store errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// No simulation registered under the id
    #[error("Unknown simulation: {0}")]
    UnknownSimulation(SimulationId),
    /// Status change not permitted by the lifecycle
    #[error("Illegal status transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: SimulationStatus,
        to: SimulationStatus,
    },
    /// The backing store failed
    #[error("Sink backend failure: {0}")]
    Backend(String),
}

/// Price and technical indicator lookups
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Close for one stock on one date
    async fn price_on(&self, stock_code: &str, date: NaiveDate)
        -> Result<Option<Price>, PortError>;
    /// Closes in `[start, end]`, ascending by date
    async fn price_history(
        &self,
        stock_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Price>, PortError>;
    /// Technical indicators for the given stocks as of `date`
    async fn indicators_batch(
        &self,
        stock_codes: &[String],
        date: NaiveDate,
    ) -> Result<Vec<TechnicalIndicator>, PortError>;
}

/// Fundamental indicator lookups
#[async_trait]
pub trait FundamentalSource: Send + Sync {
    async fn fundamentals_batch(
        &self,
        stock_codes: &[String],
        date: NaiveDate,
    ) -> Result<Vec<FundamentalIndicator>, PortError>;
}

/// Universe membership and listing data
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// Stock codes eligible on `date`, sorted by code
    async fn filter_universe(
        &self,
        date: NaiveDate,
        criteria: &UniverseCriteria,
    ) -> Result<Vec<String>, PortError>;
    /// Listing profiles (market, sector) for the given stocks
    async fn profiles(&self, stock_codes: &[String]) -> Result<Vec<StockProfile>, PortError>;
}

/// Exchange day-off calendar
#[async_trait]
pub trait TradingCalendar: Send + Sync {
    async fn is_non_trading_day(&self, date: NaiveDate) -> Result<bool, PortError>;
}

/// Bundle of read ports handed to the engine and strategies
#[derive(Clone)]
pub struct MarketPorts {
    pub prices: Arc<dyn PriceSource>,
    pub fundamentals: Arc<dyn FundamentalSource>,
    pub universe: Arc<dyn UniverseSource>,
    pub calendar: Arc<dyn TradingCalendar>,
}

impl MarketPorts {
    /// Use one adapter for every port
    pub fn from_source<T>(source: Arc<T>) -> Self
    where
        T: PriceSource + FundamentalSource + UniverseSource + TradingCalendar + 'static,
    {
        Self {
            prices: source.clone(),
            fundamentals: source.clone(),
            universe: source.clone(),
            calendar: source,
        }
    }
}

/// Lifecycle record of one simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub simulation_id: SimulationId,
    pub config: SimulationConfig,
    pub status: SimulationStatus,
    /// Failure reason for FAILED runs
    pub message: Option<String>,
}

/// Write side of the result store
///
/// All writes are append-only and scoped by simulation id.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Register a new run in PENDING state
    async fn register(&self, id: SimulationId, config: &SimulationConfig)
        -> Result<(), SinkError>;
    async fn update_status(
        &self,
        id: SimulationId,
        status: SimulationStatus,
        message: Option<String>,
    ) -> Result<(), SinkError>;
    async fn save_snapshot(&self, snapshot: PortfolioSnapshot) -> Result<(), SinkError>;
    async fn save_trade(&self, trade: TradeRecord) -> Result<(), SinkError>;
    async fn save_result(&self, result: SimulationResult) -> Result<(), SinkError>;
    async fn save_factor_scores(
        &self,
        id: SimulationId,
        scores: &[FactorScore],
    ) -> Result<(), SinkError>;
    async fn save_sector_analyses(
        &self,
        id: SimulationId,
        analyses: &[SectorAnalysis],
    ) -> Result<(), SinkError>;
}

/// Read side of the result store
#[async_trait]
pub trait ResultQuery: Send + Sync {
    async fn record(&self, id: SimulationId) -> Result<Option<SimulationRecord>, SinkError>;
    async fn result(&self, id: SimulationId) -> Result<Option<SimulationResult>, SinkError>;
    /// Snapshots ordered by date, optionally limited to an inclusive date range
    async fn snapshots(
        &self,
        id: SimulationId,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<PortfolioSnapshot>, SinkError>;
    async fn trades(&self, id: SimulationId) -> Result<Vec<TradeRecord>, SinkError>;
    async fn factor_scores(&self, id: SimulationId) -> Result<Vec<FactorScore>, SinkError>;
    async fn sector_analyses(&self, id: SimulationId) -> Result<Vec<SectorAnalysis>, SinkError>;
}

/// A store usable as both sink and query
pub trait ResultStore: ResultSink + ResultQuery {}

impl<T: ResultSink + ResultQuery> ResultStore for T {}
