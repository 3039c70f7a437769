//! JSON dataset loader
//!
//! A dataset file holds listing profiles, daily closes, indicators, and
//! exchange holidays for one market. Used by the CLI to drive runs offline.

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::InMemoryMarketData;
use crate::ports::{FundamentalIndicator, Price, StockProfile, TechnicalIndicator};

/// On-disk dataset layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    /// Treat Saturdays and Sundays as open
    pub weekends_open: bool,
    pub holidays: Vec<NaiveDate>,
    pub stocks: Vec<StockProfile>,
    pub prices: Vec<Price>,
    pub fundamentals: Vec<FundamentalIndicator>,
    pub indicators: Vec<TechnicalIndicator>,
}

impl Dataset {
    /// Read a dataset from a JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let dataset: Dataset = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
        Ok(dataset)
    }

    /// Index the dataset for port lookups
    pub fn into_market_data(self) -> InMemoryMarketData {
        let mut data = InMemoryMarketData::new();
        if self.weekends_open {
            data = data.with_weekends_open();
        }
        for date in self.holidays {
            data.add_holiday(date);
        }
        for profile in self.stocks {
            data.add_profile(profile);
        }
        for price in self.prices {
            data.add_price(price);
        }
        for indicator in self.fundamentals {
            data.add_fundamental(indicator);
        }
        for indicator in self.indicators {
            data.add_indicator(indicator);
        }
        tracing::info!("Dataset indexed");
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PriceSource, TradingCalendar, UniverseCriteria, UniverseSource};
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "holidays": ["2024-01-01"],
        "stocks": [
            {"stock_code": "005930", "name": "Samsung", "market": "KOSPI", "sector": "Tech"}
        ],
        "prices": [
            {"stock_code": "005930", "date": "2024-01-02", "close": "78500", "volume": "1200000"}
        ],
        "fundamentals": [
            {"stock_code": "005930", "date": "2024-01-02", "per": "12.5", "pbr": "1.3", "roe": "9.1"}
        ]
    }"#;

    #[tokio::test]
    async fn test_load_dataset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let data = Dataset::load(file.path()).unwrap().into_market_data();
        let jan2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let price = data.price_on("005930", jan2).await.unwrap().unwrap();
        assert_eq!(price.close.to_string(), "78500");
        assert!(data
            .is_non_trading_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap());
        let universe = data
            .filter_universe(jan2, &UniverseCriteria::default())
            .await
            .unwrap();
        assert_eq!(universe, vec!["005930"]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Dataset::load("/nonexistent/dataset.json").is_err());
    }

    #[test]
    fn test_load_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(Dataset::load(file.path()).is_err());
    }
}
