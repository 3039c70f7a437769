//! Port data types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily close for one stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub stock_code: String,
    pub date: NaiveDate,
    pub close: Decimal,
    /// Traded volume in shares
    #[serde(default)]
    pub volume: Option<Decimal>,
    /// Market capitalisation in currency units
    #[serde(default)]
    pub market_cap: Option<Decimal>,
}

/// Valuation ratios for one stock as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalIndicator {
    pub stock_code: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub per: Option<Decimal>,
    #[serde(default)]
    pub pbr: Option<Decimal>,
    /// Return on equity in percent
    #[serde(default)]
    pub roe: Option<Decimal>,
}

/// Precomputed technical indicators for one stock as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicator {
    pub stock_code: String,
    pub date: NaiveDate,
    /// Six-month price momentum in percent
    #[serde(default)]
    pub momentum_6m: Option<Decimal>,
    #[serde(default)]
    pub ma20: Option<Decimal>,
    #[serde(default)]
    pub bollinger_upper: Option<Decimal>,
    #[serde(default)]
    pub bollinger_lower: Option<Decimal>,
}

/// Static listing information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockProfile {
    pub stock_code: String,
    #[serde(default)]
    pub name: String,
    pub market: String,
    pub sector: String,
}

/// Per-sector momentum summary recorded on each sector-rotation rebalance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAnalysis {
    pub sector: String,
    pub date: NaiveDate,
    pub avg_momentum: Decimal,
    pub relative_strength: Decimal,
    pub member_count: usize,
}

/// Eligibility filter handed to the universe port
///
/// Market-cap bounds are expressed in units of 100 million.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseCriteria {
    pub market: Option<String>,
    pub min_market_cap: Option<u64>,
    pub max_market_cap: Option<u64>,
    pub exclude_sectors: Vec<String>,
    pub min_trading_volume: Option<u64>,
    pub custom: Option<CustomFilter>,
}

/// Indicator-level filter conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomFilter {
    pub min_per: Option<Decimal>,
    pub max_per: Option<Decimal>,
    pub min_pbr: Option<Decimal>,
    pub max_pbr: Option<Decimal>,
    pub min_roe: Option<Decimal>,
    pub min_momentum_6m: Option<Decimal>,
    /// Require the close to sit above the 20-day moving average
    pub price_above_ma20: Option<bool>,
}

impl UniverseCriteria {
    /// Market-cap bounds converted to currency units
    pub fn market_cap_bounds(&self) -> (Option<Decimal>, Option<Decimal>) {
        let unit = Decimal::from(100_000_000u64);
        (
            self.min_market_cap.map(|v| Decimal::from(v) * unit),
            self.max_market_cap.map(|v| Decimal::from(v) * unit),
        )
    }
}
