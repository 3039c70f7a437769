//! Sector rotation strategy
//!
//! Ranks sectors by the average six-month momentum of their members, then
//! holds the strongest stocks of the strongest sectors at equal weight.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::config::SectorRotationConfig;
use super::rebalance::{equal_weight_orders, select_top};
use super::{AuditTrail, Strategy};
use crate::execution::TradeOrder;
use crate::portfolio::{round_ratio, Portfolio};
use crate::ports::{MarketPorts, SectorAnalysis, StockProfile, TechnicalIndicator};
use crate::telemetry::{increment_counter, CounterMetric};

/// Members of one sector with their momentum
type SectorMembers = BTreeMap<String, Vec<(String, Decimal)>>;

/// Group stocks with a known momentum by sector
fn group_by_sector(profiles: &[StockProfile], technicals: &[TechnicalIndicator]) -> SectorMembers {
    let momentum: HashMap<&str, Decimal> = technicals
        .iter()
        .filter_map(|t| Some((t.stock_code.as_str(), t.momentum_6m?)))
        .collect();

    let mut sectors = SectorMembers::new();
    for profile in profiles {
        if let Some(m) = momentum.get(profile.stock_code.as_str()) {
            sectors
                .entry(profile.sector.clone())
                .or_default()
                .push((profile.stock_code.clone(), *m));
        }
    }
    sectors
}

/// Average momentum per sector; relative strength is measured against the
/// mean of all sector averages
pub fn analyze_sectors(
    date: NaiveDate,
    profiles: &[StockProfile],
    technicals: &[TechnicalIndicator],
) -> Vec<SectorAnalysis> {
    let sectors = group_by_sector(profiles, technicals);
    let averages: Vec<(String, Decimal, usize)> = sectors
        .iter()
        .map(|(sector, members)| {
            let sum: Decimal = members.iter().map(|(_, m)| *m).sum();
            (sector.clone(), sum / Decimal::from(members.len()), members.len())
        })
        .collect();
    if averages.is_empty() {
        return Vec::new();
    }

    let market = averages.iter().map(|(_, avg, _)| *avg).sum::<Decimal>()
        / Decimal::from(averages.len());
    averages
        .into_iter()
        .map(|(sector, avg, member_count)| SectorAnalysis {
            sector,
            date,
            avg_momentum: round_ratio(avg),
            relative_strength: round_ratio(avg - market),
            member_count,
        })
        .collect()
}

/// Top `stocks_per_sector` members of the top `top_sectors` sectors
pub fn select_rotation(
    analyses: &[SectorAnalysis],
    profiles: &[StockProfile],
    technicals: &[TechnicalIndicator],
    config: &SectorRotationConfig,
) -> Vec<String> {
    let sectors = group_by_sector(profiles, technicals);
    let ranked: Vec<(String, Decimal)> = analyses
        .iter()
        .map(|a| (a.sector.clone(), a.avg_momentum))
        .collect();
    let leaders = select_top(ranked, config.top_sectors, |a, b| b.cmp(a));

    let mut selected = Vec::new();
    for sector in leaders {
        if let Some(members) = sectors.get(&sector) {
            let picks = select_top(members.clone(), config.stocks_per_sector, |a, b| b.cmp(a));
            for code in picks {
                if !selected.contains(&code) {
                    selected.push(code);
                }
            }
        }
    }
    selected
}

pub struct SectorRotationStrategy {
    ports: MarketPorts,
    config: SectorRotationConfig,
    audit: Option<AuditTrail>,
}

impl SectorRotationStrategy {
    pub fn new(ports: MarketPorts, config: SectorRotationConfig, audit: Option<AuditTrail>) -> Self {
        Self {
            ports,
            config,
            audit,
        }
    }
}

#[async_trait]
impl Strategy for SectorRotationStrategy {
    async fn rebalance(
        &self,
        date: NaiveDate,
        portfolio: &Portfolio,
        universe: &[String],
    ) -> Vec<TradeOrder> {
        if universe.is_empty() {
            return Vec::new();
        }

        let profiles = self.ports.universe.profiles(universe).await;
        let technicals = self.ports.prices.indicators_batch(universe, date).await;
        let (profiles, technicals) = match (profiles, technicals) {
            (Ok(p), Ok(t)) => (p, t),
            (Err(e), _) | (_, Err(e)) => {
                increment_counter(CounterMetric::SkippedLookup);
                tracing::warn!(%date, error = %e, "Sector lookup failed, holding");
                return Vec::new();
            }
        };

        let analyses = analyze_sectors(date, &profiles, &technicals);
        if let Some(audit) = &self.audit {
            if let Err(e) = audit
                .sink
                .save_sector_analyses(audit.simulation_id, &analyses)
                .await
            {
                tracing::warn!(%date, error = %e, "Failed to persist sector analysis");
            }
        }

        let selected = select_rotation(&analyses, &profiles, &technicals, &self.config);
        tracing::debug!(%date, sectors = analyses.len(), selected = selected.len(), "Sector rotation selection");
        equal_weight_orders(self.ports.prices.as_ref(), date, portfolio, &selected).await
    }

    fn name(&self) -> &'static str {
        "sector_rotation"
    }
}
