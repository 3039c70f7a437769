//! Factor scoring module
//!
//! Cross-sectional normalization of fundamental and technical signals into
//! comparable value, momentum, and quality scores

mod scorer;
pub mod stats;

pub use scorer::FactorScorer;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scores for one stock on one rebalancing date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub stock_code: String,
    pub date: NaiveDate,
    /// Mean of the negated PER and PBR z-scores
    pub value_score: Decimal,
    /// Six-month momentum z-score
    pub momentum_score: Decimal,
    /// ROE z-score
    pub quality_score: Decimal,
    /// Weighted sum of the sub-scores
    pub total_score: Decimal,
}

/// Sub-score weights; not normalized here
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub value: Decimal,
    pub momentum: Decimal,
    pub quality: Decimal,
}
