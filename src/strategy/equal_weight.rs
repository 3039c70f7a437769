//! Equal-weight strategy

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use super::rebalance::equal_weight_orders;
use super::Strategy;
use crate::execution::TradeOrder;
use crate::portfolio::Portfolio;
use crate::ports::PriceSource;

/// Holds every universe stock at the same target value
pub struct EqualWeightStrategy {
    prices: Arc<dyn PriceSource>,
}

impl EqualWeightStrategy {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl Strategy for EqualWeightStrategy {
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder> {
        equal_weight_orders(self.prices.as_ref(), date, portfolio, universe).await
    }

    fn name(&self) -> &'static str {
        "equal_weight"
    }
}
