//! Execution types

use crate::engine::SimulationId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// A trade intent produced by a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub stock_code: String,
    pub side: Side,
    /// Whole shares
    pub quantity: u64,
    /// Quoted price the strategy sized the order with
    pub price: Decimal,
    pub date: NaiveDate,
}

impl TradeOrder {
    pub fn buy(stock_code: impl Into<String>, quantity: u64, price: Decimal, date: NaiveDate) -> Self {
        Self {
            stock_code: stock_code.into(),
            side: Side::Buy,
            quantity,
            price,
            date,
        }
    }

    pub fn sell(
        stock_code: impl Into<String>,
        quantity: u64,
        price: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            stock_code: stock_code.into(),
            side: Side::Sell,
            quantity,
            price,
            date,
        }
    }
}

/// An executed trade, appended to the run's trade log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub simulation_id: SimulationId,
    pub stock_code: String,
    pub side: Side,
    /// Executed quantity after clamping
    pub quantity: u64,
    /// Quoted price carried on the order
    pub reference_price: Decimal,
    /// Slippage-adjusted price
    pub execution_price: Decimal,
    /// `execution_price × quantity`
    pub amount: Decimal,
    pub fee: Decimal,
    /// Transaction tax, charged on sells only
    pub tax: Decimal,
    pub date: NaiveDate,
}

impl TradeRecord {
    /// Cash moved by the trade: cost for buys, proceeds for sells
    pub fn net_cash(&self) -> Decimal {
        match self.side {
            Side::Buy => self.amount + self.fee,
            Side::Sell => self.amount - self.fee - self.tax,
        }
    }
}
