//! Multi-factor strategy

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::config::MultiFactorConfig;
use super::rebalance::{equal_weight_orders, select_top};
use super::{AuditTrail, Strategy};
use crate::execution::TradeOrder;
use crate::factor::{FactorScorer, FactorWeights};
use crate::portfolio::Portfolio;
use crate::ports::MarketPorts;
use crate::telemetry::{increment_counter, CounterMetric};

/// Ranks by weighted value/momentum/quality z-scores and holds the top-N
pub struct MultiFactorStrategy {
    ports: MarketPorts,
    config: MultiFactorConfig,
    scorer: FactorScorer,
    audit: Option<AuditTrail>,
}

impl MultiFactorStrategy {
    pub fn new(ports: MarketPorts, config: MultiFactorConfig, audit: Option<AuditTrail>) -> Self {
        Self {
            ports,
            config,
            scorer: FactorScorer::new(),
            audit,
        }
    }

    fn weights(&self) -> FactorWeights {
        FactorWeights {
            value: self.config.value_weight,
            momentum: self.config.momentum_weight,
            quality: self.config.quality_weight,
        }
    }
}

#[async_trait]
impl Strategy for MultiFactorStrategy {
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder> {
        if universe.is_empty() {
            return Vec::new();
        }

        let fundamentals = self.ports.fundamentals.fundamentals_batch(universe, date).await;
        let technicals = self.ports.prices.indicators_batch(universe, date).await;
        let (fundamentals, technicals) = match (fundamentals, technicals) {
            (Ok(f), Ok(t)) => (f, t),
            (Err(e), _) | (_, Err(e)) => {
                increment_counter(CounterMetric::SkippedLookup);
                tracing::warn!(%date, error = %e, "Indicator lookup failed, holding");
                return Vec::new();
            }
        };

        let scores = self
            .scorer
            .score(date, &fundamentals, &technicals, &self.weights());

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.sink.save_factor_scores(audit.simulation_id, &scores).await {
                tracing::warn!(%date, error = %e, "Failed to persist factor scores");
            }
        }

        let ranked: Vec<(String, Decimal)> = scores
            .iter()
            .map(|s| (s.stock_code.clone(), s.total_score))
            .collect();
        let selected = select_top(ranked, self.config.top_n, |a, b| b.cmp(a));

        tracing::debug!(%date, scored = scores.len(), selected = selected.len(), "Multi-factor selection");
        equal_weight_orders(self.ports.prices.as_ref(), date, portfolio, &selected).await
    }

    fn name(&self) -> &'static str {
        "multi_factor"
    }
}
