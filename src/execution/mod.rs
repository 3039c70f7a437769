//! Execution module
//!
//! Trade intents, executed trade records, slippage models, and the order
//! executor that applies them to a portfolio

mod executor;
mod slippage;
mod types;

pub use executor::OrderExecutor;
pub use slippage::{
    create_slippage_model, FixedSlippage, NoSlippage, SlippageModel, VolumeBasedSlippage,
};
pub use types::{Side, TradeOrder, TradeRecord};
