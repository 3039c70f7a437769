//! Momentum strategy
//!
//! Blends 20/60/120 trading-day close-to-close returns and holds the top-N
//! stocks at equal weight.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use super::rebalance::{equal_weight_orders, select_top};
use super::Strategy;
use crate::engine::calendar_lookback;
use crate::execution::TradeOrder;
use crate::portfolio::Portfolio;
use crate::ports::PriceSource;
use crate::telemetry::{increment_counter, CounterMetric};

/// (window in trading days, weight)
const WINDOWS: [(usize, Decimal); 3] = [(20, dec!(0.5)), (60, dec!(0.3)), (120, dec!(0.2))];

/// Simple return over the last `days` observations; `None` without enough data
pub fn period_return(closes: &[Decimal], days: usize) -> Option<Decimal> {
    if closes.len() < days + 1 {
        return None;
    }
    let end = closes[closes.len() - 1];
    let start = closes[closes.len() - 1 - days];
    if start <= Decimal::ZERO {
        return None;
    }
    Some((end - start) / start)
}

/// Weighted multi-window momentum; `None` unless every window has data
pub fn momentum_score(closes: &[Decimal]) -> Option<Decimal> {
    WINDOWS.iter().try_fold(Decimal::ZERO, |acc, (days, weight)| {
        Some(acc + *weight * period_return(closes, *days)?)
    })
}

pub struct MomentumStrategy {
    prices: Arc<dyn PriceSource>,
    top_n: usize,
}

impl MomentumStrategy {
    pub fn new(prices: Arc<dyn PriceSource>, top_n: usize) -> Self {
        Self { prices, top_n }
    }

    async fn score(&self, stock_code: &str, date: NaiveDate) -> Option<Decimal> {
        let longest = WINDOWS[WINDOWS.len() - 1].0;
        let start = date.checked_sub_days(calendar_lookback(longest))?;
        let history = match self.prices.price_history(stock_code, start, date).await {
            Ok(history) => history,
            Err(e) => {
                increment_counter(CounterMetric::SkippedLookup);
                tracing::warn!(stock_code, %date, error = %e, "History lookup failed, skipping");
                return None;
            }
        };
        let closes: Vec<Decimal> = history.iter().map(|p| p.close).collect();
        momentum_score(&closes)
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder> {
        let mut scored = Vec::new();
        for code in universe {
            if let Some(score) = self.score(code, date).await {
                scored.push((code.clone(), score));
            }
        }

        let selected = select_top(scored, self.top_n, |a, b| b.cmp(a));
        tracing::debug!(%date, selected = selected.len(), "Momentum selection");
        equal_weight_orders(self.prices.as_ref(), date, portfolio, &selected).await
    }

    fn name(&self) -> &'static str {
        "momentum"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryMarketData;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    /// 121 consecutive daily closes ending on `date()`, growing by `step` per day
    fn linear_history(data: &mut InMemoryMarketData, code: &str, start: Decimal, step: Decimal) {
        let first = date() - chrono::Days::new(120);
        for i in 0..=120u32 {
            let day = first + chrono::Days::new(i as u64);
            data.add_close(code, day, start + step * Decimal::from(i));
        }
    }

    #[test]
    fn test_period_return() {
        let closes = vec![dec!(100), dec!(110), dec!(120)];
        assert_eq!(period_return(&closes, 2), Some(dec!(0.2)));
        assert_eq!(period_return(&closes, 3), None);
    }

    #[test]
    fn test_momentum_requires_all_windows() {
        let closes: Vec<Decimal> = (0..120).map(|i| Decimal::from(100 + i)).collect();
        assert!(momentum_score(&closes).is_none());

        let closes: Vec<Decimal> = (0..121).map(|_| dec!(100)).collect();
        assert_eq!(momentum_score(&closes), Some(dec!(0)));
    }

    #[tokio::test]
    async fn test_selects_strongest() {
        let mut data = InMemoryMarketData::new();
        linear_history(&mut data, "UP", dec!(100), dec!(1));
        linear_history(&mut data, "FLAT", dec!(100), dec!(0));
        linear_history(&mut data, "DOWN", dec!(300), dec!(-1));
        data.add_close("SHORT", date(), dec!(100));

        let strategy = MomentumStrategy::new(Arc::new(data), 1);
        let universe: Vec<String> = ["DOWN", "FLAT", "SHORT", "UP"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let orders = strategy
            .rebalance(date(), &Portfolio::new(dec!(100000)), &universe)
            .await;

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].stock_code, "UP");
        // 100000 / 220
        assert_eq!(orders[0].quantity, 454);
    }
}
