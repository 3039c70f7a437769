//! Portfolio snapshots

use super::Holding;
use crate::engine::SimulationId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Persisted portfolio state on a rebalancing date or month end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub simulation_id: SimulationId,
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub cash_balance: Decimal,
    pub holdings: Vec<Holding>,
}

impl PortfolioSnapshot {
    /// Holdings serialized as JSON, the form stored alongside the snapshot row
    pub fn holdings_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.holdings)
    }

    /// Deviation of `cash + Σ market value` from the recorded total
    pub fn valuation_gap(&self) -> Decimal {
        let holdings: Decimal = self.holdings.iter().map(|h| h.market_value).sum();
        (self.cash_balance + holdings - self.total_value).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_holdings_json_roundtrip_shape() {
        let snapshot = PortfolioSnapshot {
            simulation_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 3, 29).unwrap(),
            total_value: dec!(1500),
            cash_balance: dec!(500),
            holdings: vec![Holding {
                stock_code: "A".to_string(),
                quantity: 10,
                average_cost: dec!(95),
                current_price: dec!(100),
                market_value: dec!(1000),
            }],
        };

        let json = snapshot.holdings_json().unwrap();
        assert!(json.contains("\"stock_code\":\"A\""));
        assert_eq!(snapshot.valuation_gap(), dec!(0));
    }
}
