//! Order execution against a portfolio
//!
//! Applies slippage, fees, and taxes, and clamps quantities so the portfolio
//! never borrows cash, never sells short, and never exceeds the per-stock cap.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{create_slippage_model, Side, SlippageModel, TradeOrder, TradeRecord};
use crate::config::SimulationConfig;
use crate::engine::SimulationId;
use crate::portfolio::{round_currency, Portfolio};
use crate::telemetry::{increment_counter, CounterMetric};

/// Executes trade orders for one simulation run
pub struct OrderExecutor {
    fee_rate: Decimal,
    tax_rate: Decimal,
    max_weight_per_stock: Option<Decimal>,
    slippage: Box<dyn SlippageModel>,
}

impl OrderExecutor {
    pub fn new(fee_rate: Decimal, tax_rate: Decimal, slippage: Box<dyn SlippageModel>) -> Self {
        Self {
            fee_rate,
            tax_rate,
            max_weight_per_stock: None,
            slippage,
        }
    }

    /// Create from SimulationConfig
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.fee_rate,
            config.tax_rate,
            create_slippage_model(&config.slippage),
        )
        .with_max_weight(config.max_weight_per_stock)
    }

    /// Cap each position at a fraction of total portfolio value
    pub fn with_max_weight(mut self, cap: Option<Decimal>) -> Self {
        self.max_weight_per_stock = cap;
        self
    }

    pub fn slippage_model_name(&self) -> &'static str {
        self.slippage.name()
    }

    /// Execute one order; `None` when the clamped quantity is zero
    pub fn execute(
        &self,
        simulation_id: SimulationId,
        portfolio: &mut Portfolio,
        order: &TradeOrder,
    ) -> Option<TradeRecord> {
        if order.quantity == 0 || order.price <= Decimal::ZERO {
            return None;
        }

        let record = match order.side {
            Side::Buy => self.execute_buy(simulation_id, portfolio, order),
            Side::Sell => self.execute_sell(simulation_id, portfolio, order),
        }?;

        let metric = match record.side {
            Side::Buy => CounterMetric::BuyTrade,
            Side::Sell => CounterMetric::SellTrade,
        };
        increment_counter(metric);
        tracing::debug!(
            %simulation_id,
            stock_code = %record.stock_code,
            side = record.side.as_str(),
            requested = order.quantity,
            executed = record.quantity,
            price = %record.execution_price,
            "Order executed"
        );
        Some(record)
    }

    fn buy_cost(&self, execution_price: Decimal, quantity: u64) -> (Decimal, Decimal) {
        let amount = execution_price * Decimal::from(quantity);
        let fee = round_currency(amount * self.fee_rate);
        (amount, fee)
    }

    /// Largest quantity whose cost plus fee fits in `cash`
    fn affordable_quantity(&self, execution_price: Decimal, cash: Decimal, wanted: u64) -> u64 {
        let unit_cost = execution_price * (Decimal::ONE + self.fee_rate);
        let mut quantity = (cash / unit_cost)
            .floor()
            .to_u64()
            .unwrap_or(0)
            .min(wanted);

        // Fee rounding can push the last share over budget
        while quantity > 0 {
            let (amount, fee) = self.buy_cost(execution_price, quantity);
            if amount + fee <= cash {
                break;
            }
            quantity -= 1;
        }
        quantity
    }

    fn execute_buy(
        &self,
        simulation_id: SimulationId,
        portfolio: &mut Portfolio,
        order: &TradeOrder,
    ) -> Option<TradeRecord> {
        let execution_price = self
            .slippage
            .execution_price(order.price, order.quantity, Side::Buy);
        if execution_price <= Decimal::ZERO {
            return None;
        }

        let mut quantity = order.quantity;
        if let Some(cap) = self.max_weight_per_stock {
            let limit = cap * portfolio.total_value();
            let held_value = portfolio
                .holding(&order.stock_code)
                .map_or(Decimal::ZERO, |h| h.market_value);
            let room = limit - held_value;
            let cap_quantity = if room > Decimal::ZERO {
                (room / execution_price).floor().to_u64().unwrap_or(0)
            } else {
                0
            };
            if cap_quantity < quantity {
                tracing::debug!(
                    stock_code = %order.stock_code,
                    requested = quantity,
                    allowed = cap_quantity,
                    "Buy clamped by max weight"
                );
                quantity = cap_quantity;
            }
        }

        let affordable = self.affordable_quantity(execution_price, portfolio.cash(), quantity);
        if affordable < quantity {
            tracing::debug!(
                stock_code = %order.stock_code,
                requested = quantity,
                allowed = affordable,
                "Buy clamped by available cash"
            );
            quantity = affordable;
        }
        if quantity == 0 {
            return None;
        }

        let (amount, fee) = self.buy_cost(execution_price, quantity);
        if let Err(e) = portfolio.buy(
            &order.stock_code,
            quantity,
            execution_price,
            order.price,
            amount + fee,
        ) {
            tracing::warn!(stock_code = %order.stock_code, error = %e, "Buy rejected");
            return None;
        }

        Some(TradeRecord {
            simulation_id,
            stock_code: order.stock_code.clone(),
            side: Side::Buy,
            quantity,
            reference_price: order.price,
            execution_price,
            amount,
            fee,
            tax: Decimal::ZERO,
            date: order.date,
        })
    }

    fn execute_sell(
        &self,
        simulation_id: SimulationId,
        portfolio: &mut Portfolio,
        order: &TradeOrder,
    ) -> Option<TradeRecord> {
        let quantity = order.quantity.min(portfolio.quantity(&order.stock_code));
        if quantity == 0 {
            return None;
        }

        let execution_price = self
            .slippage
            .execution_price(order.price, order.quantity, Side::Sell);
        let amount = execution_price * Decimal::from(quantity);
        let fee = round_currency(amount * self.fee_rate);
        let tax = round_currency(amount * self.tax_rate);
        let proceeds = (amount - fee - tax).max(Decimal::ZERO);

        if let Err(e) = portfolio.sell(&order.stock_code, quantity, proceeds) {
            tracing::warn!(stock_code = %order.stock_code, error = %e, "Sell rejected");
            return None;
        }

        Some(TradeRecord {
            simulation_id,
            stock_code: order.stock_code.clone(),
            side: Side::Sell,
            quantity,
            reference_price: order.price,
            execution_price,
            amount,
            fee,
            tax,
            date: order.date,
        })
    }
}
