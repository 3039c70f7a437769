//! Grid-search optimization
//!
//! Parameter-space enumeration and the bounded worker pool that runs one
//! isolated simulation per combination.

mod grid;
mod orchestrator;

pub use grid::{expand_grid, top_n_values, weight_simplex};
pub use orchestrator::{GridJob, GridOutcome, GridSearchOrchestrator};
