//! Data adapters
//!
//! In-memory implementations of the market data ports and the result store,
//! plus a JSON dataset loader for offline runs.

mod dataset;
mod memory;
mod store;

pub use dataset::Dataset;
pub use memory::InMemoryMarketData;
pub use store::InMemoryStore;
