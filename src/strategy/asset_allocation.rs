//! Asset allocation strategy
//!
//! Sizes the risk-asset sleeve with an optional dual-momentum gate and splits
//! it equally or by inverse band-width volatility.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::config::{AllocationWeighting, AssetAllocationConfig};
use super::rebalance::{liquidate_outside, target_value_orders};
use super::Strategy;
use crate::execution::TradeOrder;
use crate::portfolio::{round_currency, round_ratio, Portfolio};
use crate::ports::{PriceSource, TechnicalIndicator};
use crate::telemetry::{increment_counter, CounterMetric};

/// Lower bound for the volatility proxy
const MIN_VOLATILITY: Decimal = dec!(0.01);

/// Mean six-month momentum over stocks that report one; 0 when none do
pub fn average_momentum(technicals: &[TechnicalIndicator]) -> Decimal {
    let values: Vec<Decimal> = technicals.iter().filter_map(|t| t.momentum_6m).collect();
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

/// Band width relative to the 20-day average, floored at 0.01.
///
/// Falls back to the band width itself when the average is missing.
pub fn volatility_proxy(indicator: &TechnicalIndicator) -> Option<Decimal> {
    let width = indicator.bollinger_upper? - indicator.bollinger_lower?;
    let base = indicator.ma20.unwrap_or(width);
    let vol = if base > Decimal::ZERO {
        width / base
    } else {
        MIN_VOLATILITY
    };
    Some(if vol <= Decimal::ZERO { MIN_VOLATILITY } else { vol })
}

/// Per-stock weights of the risk sleeve, keyed by stock code
pub fn sleeve_weights(
    universe: &[String],
    technicals: &[TechnicalIndicator],
    weighting: AllocationWeighting,
) -> BTreeMap<String, Decimal> {
    match weighting {
        AllocationWeighting::Equal => {
            let weight = round_ratio(Decimal::ONE / Decimal::from(universe.len()));
            universe.iter().map(|code| (code.clone(), weight)).collect()
        }
        AllocationWeighting::RiskParity => {
            let members: HashSet<&str> = universe.iter().map(String::as_str).collect();
            let inverse: BTreeMap<String, Decimal> = technicals
                .iter()
                .filter(|t| members.contains(t.stock_code.as_str()))
                .filter_map(|t| Some((t.stock_code.clone(), Decimal::ONE / volatility_proxy(t)?)))
                .collect();
            let total: Decimal = inverse.values().sum();
            if total <= Decimal::ZERO {
                return BTreeMap::new();
            }
            inverse
                .into_iter()
                .map(|(code, inv)| (code, inv / total))
                .collect()
        }
    }
}

pub struct AssetAllocationStrategy {
    prices: Arc<dyn PriceSource>,
    config: AssetAllocationConfig,
}

impl AssetAllocationStrategy {
    pub fn new(prices: Arc<dyn PriceSource>, config: AssetAllocationConfig) -> Self {
        Self { prices, config }
    }
}

#[async_trait]
impl Strategy for AssetAllocationStrategy {
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder> {
        if universe.is_empty() {
            return Vec::new();
        }
        let technicals = match self.prices.indicators_batch(universe, date).await {
            Ok(technicals) => technicals,
            Err(e) => {
                increment_counter(CounterMetric::SkippedLookup);
                tracing::warn!(%date, error = %e, "Indicator lookup failed, holding");
                return Vec::new();
            }
        };

        let market_momentum = average_momentum(&technicals);
        let mut risk_weight = self.config.max_risk_asset_weight;
        if self.config.dual_momentum && market_momentum < Decimal::ZERO {
            tracing::info!(%date, %market_momentum, "Dual momentum negative, moving to cash");
            risk_weight = Decimal::ZERO;
        }

        let sleeve = round_currency(portfolio.total_value() * risk_weight);
        if sleeve <= Decimal::ZERO {
            return liquidate_outside(portfolio, &HashSet::new(), date);
        }

        let targets: Vec<(String, Decimal)> =
            sleeve_weights(universe, &technicals, self.config.weighting)
                .into_iter()
                .filter(|(_, w)| *w > Decimal::ZERO)
                .map(|(code, w)| (code, round_currency(sleeve * w)))
                .collect();
        target_value_orders(self.prices.as_ref(), date, portfolio, &targets).await
    }

    fn name(&self) -> &'static str {
        "asset_allocation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryMarketData;
    use crate::execution::Side;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    fn technical(code: &str, momentum: Decimal, upper: Decimal, lower: Decimal) -> TechnicalIndicator {
        TechnicalIndicator {
            stock_code: code.to_string(),
            date: date(),
            momentum_6m: Some(momentum),
            ma20: Some(dec!(100)),
            bollinger_upper: Some(upper),
            bollinger_lower: Some(lower),
        }
    }

    fn market(momenta: [Decimal; 2]) -> InMemoryMarketData {
        let mut data = InMemoryMarketData::new();
        data.add_close("A", date(), dec!(100));
        data.add_close("B", date(), dec!(100));
        data.add_indicator(technical("A", momenta[0], dec!(110), dec!(90)));
        data.add_indicator(technical("B", momenta[1], dec!(105), dec!(95)));
        data
    }

    fn universe() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    #[test]
    fn test_volatility_proxy() {
        let t = technical("A", dec!(0), dec!(110), dec!(90));
        assert_eq!(volatility_proxy(&t), Some(dec!(0.2)));

        let flat = technical("A", dec!(0), dec!(100), dec!(100));
        assert_eq!(volatility_proxy(&flat), Some(dec!(0.01)));

        let mut missing = t.clone();
        missing.bollinger_lower = None;
        assert!(volatility_proxy(&missing).is_none());
    }

    #[test]
    fn test_risk_parity_weights_inverse_volatility() {
        let technicals = vec![
            technical("A", dec!(0), dec!(110), dec!(90)),
            technical("B", dec!(0), dec!(105), dec!(95)),
        ];
        let weights = sleeve_weights(&universe(), &technicals, AllocationWeighting::RiskParity);
        // 1/0.2 = 5, 1/0.1 = 10
        assert_eq!(round_ratio(weights["A"]), dec!(0.3333));
        assert_eq!(round_ratio(weights["B"]), dec!(0.6667));
    }

    #[test]
    fn test_equal_weights_rounded() {
        let codes: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let weights = sleeve_weights(&codes, &[], AllocationWeighting::Equal);
        assert!(weights.values().all(|w| *w == dec!(0.3333)));
    }

    #[tokio::test]
    async fn test_dual_momentum_moves_to_cash() {
        let strategy = AssetAllocationStrategy::new(
            Arc::new(market([dec!(-5), dec!(-1)])),
            AssetAllocationConfig::default(),
        );
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.buy("A", 10, dec!(100), dec!(100), dec!(1000)).unwrap();

        let orders = strategy.rebalance(date(), &portfolio, &universe()).await;
        assert_eq!(orders, vec![TradeOrder::sell("A", 10, dec!(100), date())]);
    }

    #[tokio::test]
    async fn test_capped_risk_sleeve() {
        let config = AssetAllocationConfig {
            max_risk_asset_weight: dec!(0.5),
            ..Default::default()
        };
        let strategy = AssetAllocationStrategy::new(Arc::new(market([dec!(5), dec!(1)])), config);

        let orders = strategy
            .rebalance(date(), &Portfolio::new(dec!(10000)), &universe())
            .await;
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.side == Side::Buy && o.quantity == 25));
    }
}
