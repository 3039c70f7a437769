//! Simulation engine module
//!
//! The day loop, its calendar rules, run lifecycle types, and cancellation.

mod control;
mod schedule;
mod simulator;
mod types;

pub use control::RunControl;
pub use schedule::{
    calendar_lookback, is_month_end, is_rebalancing_date, is_snapshot_date, RebalancingPeriod,
};
pub use simulator::SimulationEngine;
pub use types::{EngineError, SimulationId, SimulationStatus};
