//! Engine types

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ports::{PortError, SinkError};

/// Simulation identifier
pub type SimulationId = Uuid;

/// Simulation lifecycle state
///
/// `Pending → Running → {Completed, Failed}`; a pending run may also fail
/// before it starts (cancelled while queued).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SimulationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SimulationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimulationStatus::Completed | SimulationStatus::Failed)
    }

    pub fn can_transition_to(&self, next: SimulationStatus) -> bool {
        use SimulationStatus::*;
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Failed) | (Running, Completed) | (Running, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationStatus::Pending => "PENDING",
            SimulationStatus::Running => "RUNNING",
            SimulationStatus::Completed => "COMPLETED",
            SimulationStatus::Failed => "FAILED",
        }
    }
}

/// Simulation run errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Run was cancelled between days
    #[error("Simulation cancelled")]
    Cancelled,
    /// A port failed in a way that cannot be skipped
    #[error("Port failure: {0}")]
    Port(#[from] PortError),
    /// Results could not be persisted
    #[error("Sink failure: {0}")]
    Sink(#[from] SinkError),
    /// Any other unexpected failure inside the day loop
    #[error("Simulation failed: {0}")]
    Failure(String),
}
