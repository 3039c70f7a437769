//! Factor scorer

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::stats::winsorized_z_scores;
use super::{FactorScore, FactorWeights};
use crate::portfolio::round_ratio;
use crate::ports::{FundamentalIndicator, TechnicalIndicator};

/// Default winsorization bound in standard deviations
const DEFAULT_BOUND: f64 = 3.0;

/// Raw signals for one stock with every field present
struct RawSignals<'a> {
    stock_code: &'a str,
    per: f64,
    pbr: f64,
    roe: f64,
    momentum: f64,
}

/// Cross-sectional z-score scorer
#[derive(Debug, Clone)]
pub struct FactorScorer {
    bound: f64,
}

impl Default for FactorScorer {
    fn default() -> Self {
        Self {
            bound: DEFAULT_BOUND,
        }
    }
}

impl FactorScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score every stock present in both inputs with all fields non-null.
    ///
    /// Output is ordered by stock code.
    pub fn score(
        &self,
        date: NaiveDate,
        fundamentals: &[FundamentalIndicator],
        technicals: &[TechnicalIndicator],
        weights: &FactorWeights,
    ) -> Vec<FactorScore> {
        let momentum_by_code: BTreeMap<&str, f64> = technicals
            .iter()
            .filter_map(|t| Some((t.stock_code.as_str(), t.momentum_6m?.to_f64()?)))
            .collect();

        let mut signals: BTreeMap<&str, RawSignals> = BTreeMap::new();
        for f in fundamentals {
            let code = f.stock_code.as_str();
            let Some(&momentum) = momentum_by_code.get(code) else {
                continue;
            };
            let (Some(per), Some(pbr), Some(roe)) = (f.per, f.pbr, f.roe) else {
                continue;
            };
            let (Some(per), Some(pbr), Some(roe)) = (per.to_f64(), pbr.to_f64(), roe.to_f64())
            else {
                continue;
            };
            signals.entry(code).or_insert(RawSignals {
                stock_code: code,
                per,
                pbr,
                roe,
                momentum,
            });
        }

        if signals.is_empty() {
            return Vec::new();
        }

        let rows: Vec<&RawSignals> = signals.values().collect();
        let column = |f: fn(&RawSignals) -> f64| -> Vec<f64> {
            winsorized_z_scores(&rows.iter().map(|r| f(r)).collect::<Vec<_>>(), self.bound)
        };
        let z_per = column(|r| r.per);
        let z_pbr = column(|r| r.pbr);
        let z_roe = column(|r| r.roe);
        let z_mom = column(|r| r.momentum);

        let w_value = weights.value.to_f64().unwrap_or(0.0);
        let w_momentum = weights.momentum.to_f64().unwrap_or(0.0);
        let w_quality = weights.quality.to_f64().unwrap_or(0.0);

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let value = (-z_per[i] - z_pbr[i]) / 2.0;
                let quality = z_roe[i];
                let momentum = z_mom[i];
                let total = w_value * value + w_momentum * momentum + w_quality * quality;
                FactorScore {
                    stock_code: row.stock_code.to_string(),
                    date,
                    value_score: to_score(value),
                    momentum_score: to_score(momentum),
                    quality_score: to_score(quality),
                    total_score: to_score(total),
                }
            })
            .collect()
    }
}

fn to_score(value: f64) -> Decimal {
    Decimal::try_from(value).map(round_ratio).unwrap_or(Decimal::ZERO)
}
