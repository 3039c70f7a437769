//! Low-volatility strategy

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::rebalance::{equal_weight_orders, select_top};
use super::Strategy;
use crate::engine::calendar_lookback;
use crate::execution::TradeOrder;
use crate::factor::stats::population_std;
use crate::portfolio::Portfolio;
use crate::ports::PriceSource;
use crate::telemetry::{increment_counter, CounterMetric};

/// Daily-return standard deviation over the trailing `window` returns.
///
/// Returns with a non-positive base price are dropped; `None` when fewer than
/// `window - 1` usable returns remain.
pub fn return_volatility(closes: &[Decimal], window: usize) -> Option<f64> {
    let tail = &closes[closes.len().saturating_sub(window + 1)..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (pair[0].to_f64()?, pair[1].to_f64()?);
            (prev > 0.0).then(|| curr / prev - 1.0)
        })
        .collect();

    if returns.len() + 1 < window {
        return None;
    }
    Some(population_std(&returns))
}

pub struct LowVolatilityStrategy {
    prices: Arc<dyn PriceSource>,
    top_n: usize,
    window: usize,
}

impl LowVolatilityStrategy {
    pub fn new(prices: Arc<dyn PriceSource>, top_n: usize, window: usize) -> Self {
        Self {
            prices,
            top_n,
            window,
        }
    }

    async fn volatility(&self, stock_code: &str, date: NaiveDate) -> Option<f64> {
        let start = date.checked_sub_days(calendar_lookback(self.window + 1))?;
        match self.prices.price_history(stock_code, start, date).await {
            Ok(history) => {
                let closes: Vec<Decimal> = history.iter().map(|p| p.close).collect();
                return_volatility(&closes, self.window)
            }
            Err(e) => {
                increment_counter(CounterMetric::SkippedLookup);
                tracing::warn!(stock_code, %date, error = %e, "History lookup failed, skipping");
                None
            }
        }
    }
}

#[async_trait]
impl Strategy for LowVolatilityStrategy {
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder> {
        let mut scored = Vec::new();
        for code in universe {
            if let Some(vol) = self.volatility(code, date).await {
                scored.push((code.clone(), vol));
            }
        }

        let selected = select_top(scored, self.top_n, |a: &f64, b: &f64| a.total_cmp(b));
        tracing::debug!(%date, selected = selected.len(), "Low-volatility selection");
        equal_weight_orders(self.prices.as_ref(), date, portfolio, &selected).await
    }

    fn name(&self) -> &'static str {
        "low_volatility"
    }
}
