//! Portfolio state
//!
//! Cash plus whole-share holdings, owned by exactly one simulation run.
//! Total value is always derived as `cash + Σ holding.market_value`.

mod snapshot;

pub use snapshot::PortfolioSnapshot;

use crate::engine::SimulationId;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Round a currency amount to 2 dp, half away from zero
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a score or ratio to 4 dp, half away from zero
pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Portfolio mutation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortfolioError {
    /// Debit would take cash below zero
    #[error("Insufficient cash: need {needed}, have {available}")]
    InsufficientCash { needed: Decimal, available: Decimal },
    /// Sell exceeds the held quantity
    #[error("Insufficient quantity for {stock_code}: need {needed}, hold {held}")]
    InsufficientQuantity {
        stock_code: String,
        needed: u64,
        held: u64,
    },
}

/// A single stock position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub stock_code: String,
    pub quantity: u64,
    /// Volume-weighted execution price, 2 dp
    pub average_cost: Decimal,
    /// Last known market price
    pub current_price: Decimal,
    /// `quantity × current_price`
    pub market_value: Decimal,
}

impl Holding {
    fn new(stock_code: &str, quantity: u64, average_cost: Decimal, price: Decimal) -> Self {
        Self {
            stock_code: stock_code.to_string(),
            quantity,
            average_cost,
            current_price: price,
            market_value: price * Decimal::from(quantity),
        }
    }

    /// Revalue at a new market price
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.market_value = price * Decimal::from(self.quantity);
    }
}

/// Cash and holdings for one run
#[derive(Debug, Clone)]
pub struct Portfolio {
    cash: Decimal,
    holdings: BTreeMap<String, Holding>,
}

impl Portfolio {
    /// Create an all-cash portfolio
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            cash: initial_capital,
            holdings: BTreeMap::new(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Holdings ordered by stock code
    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    pub fn holding(&self, stock_code: &str) -> Option<&Holding> {
        self.holdings.get(stock_code)
    }

    pub fn quantity(&self, stock_code: &str) -> u64 {
        self.holdings.get(stock_code).map_or(0, |h| h.quantity)
    }

    /// Held stock codes in ascending order
    pub fn held_codes(&self) -> Vec<String> {
        self.holdings.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Sum of holding market values
    pub fn holdings_value(&self) -> Decimal {
        self.holdings.values().map(|h| h.market_value).sum()
    }

    /// Cash plus holdings value
    pub fn total_value(&self) -> Decimal {
        self.cash + self.holdings_value()
    }

    /// Add shares bought at `execution_price`, debiting `cost` from cash.
    ///
    /// The holding is marked at `market_price`; its average cost blends in the
    /// execution price.
    pub fn buy(
        &mut self,
        stock_code: &str,
        quantity: u64,
        execution_price: Decimal,
        market_price: Decimal,
        cost: Decimal,
    ) -> Result<(), PortfolioError> {
        if cost > self.cash {
            return Err(PortfolioError::InsufficientCash {
                needed: cost,
                available: self.cash,
            });
        }
        if quantity == 0 {
            return Ok(());
        }

        self.cash -= cost;
        match self.holdings.get_mut(stock_code) {
            Some(holding) => {
                let old_qty = Decimal::from(holding.quantity);
                let add_qty = Decimal::from(quantity);
                let blended = (holding.average_cost * old_qty + execution_price * add_qty)
                    / (old_qty + add_qty);
                holding.quantity += quantity;
                holding.average_cost = round_currency(blended);
                holding.mark(market_price);
            }
            None => {
                self.holdings.insert(
                    stock_code.to_string(),
                    Holding::new(stock_code, quantity, execution_price, market_price),
                );
            }
        }
        Ok(())
    }

    /// Remove sold shares and credit `proceeds` to cash
    pub fn sell(
        &mut self,
        stock_code: &str,
        quantity: u64,
        proceeds: Decimal,
    ) -> Result<(), PortfolioError> {
        let held = self.quantity(stock_code);
        if quantity > held {
            return Err(PortfolioError::InsufficientQuantity {
                stock_code: stock_code.to_string(),
                needed: quantity,
                held,
            });
        }
        if quantity == 0 {
            return Ok(());
        }

        if quantity == held {
            self.holdings.remove(stock_code);
        } else if let Some(holding) = self.holdings.get_mut(stock_code) {
            holding.quantity -= quantity;
            let price = holding.current_price;
            holding.mark(price);
        }
        self.cash += proceeds;
        Ok(())
    }

    /// Refresh the market price of a held stock; returns false if not held
    pub fn mark(&mut self, stock_code: &str, price: Decimal) -> bool {
        match self.holdings.get_mut(stock_code) {
            Some(holding) => {
                holding.mark(price);
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy for persistence
    pub fn snapshot(&self, simulation_id: SimulationId, date: NaiveDate) -> PortfolioSnapshot {
        PortfolioSnapshot {
            simulation_id,
            date,
            total_value: self.total_value(),
            cash_balance: self.cash,
            holdings: self.holdings.values().cloned().collect(),
        }
    }
}
