//! Value strategy
//!
//! Score = w_per / PER + w_pbr / PBR + w_roe × ROE / 100, top-N at equal weight.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::config::ValueConfig;
use super::rebalance::{equal_weight_orders, select_top};
use super::Strategy;
use crate::execution::TradeOrder;
use crate::portfolio::Portfolio;
use crate::ports::{FundamentalIndicator, FundamentalSource, PriceSource};
use crate::telemetry::{increment_counter, CounterMetric};

/// Value score, or `None` when any ratio is missing or non-positive
pub fn value_score(indicator: &FundamentalIndicator, config: &ValueConfig) -> Option<Decimal> {
    let per = indicator.per.filter(|v| *v > Decimal::ZERO)?;
    let pbr = indicator.pbr.filter(|v| *v > Decimal::ZERO)?;
    let roe = indicator.roe.filter(|v| *v > Decimal::ZERO)?;

    Some(
        config.per_weight / per
            + config.pbr_weight / pbr
            + config.roe_weight * roe / Decimal::ONE_HUNDRED,
    )
}

pub struct ValueStrategy {
    prices: Arc<dyn PriceSource>,
    fundamentals: Arc<dyn FundamentalSource>,
    config: ValueConfig,
}

impl ValueStrategy {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        fundamentals: Arc<dyn FundamentalSource>,
        config: ValueConfig,
    ) -> Self {
        Self {
            prices,
            fundamentals,
            config,
        }
    }
}

#[async_trait]
impl Strategy for ValueStrategy {
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder> {
        if universe.is_empty() {
            return Vec::new();
        }
        let indicators = match self.fundamentals.fundamentals_batch(universe, date).await {
            Ok(indicators) => indicators,
            Err(e) => {
                increment_counter(CounterMetric::SkippedLookup);
                tracing::warn!(%date, error = %e, "Fundamental lookup failed, holding");
                return Vec::new();
            }
        };

        let scored: Vec<(String, Decimal)> = indicators
            .iter()
            .filter_map(|ind| Some((ind.stock_code.clone(), value_score(ind, &self.config)?)))
            .collect();
        let selected = select_top(scored, self.config.top_n, |a, b| b.cmp(a));

        tracing::debug!(%date, selected = selected.len(), "Value selection");
        equal_weight_orders(self.prices.as_ref(), date, portfolio, &selected).await
    }

    fn name(&self) -> &'static str {
        "value"
    }
}
