//! In-memory market data adapter
//!
//! Implements every read port over point-in-time maps. Fundamentals and
//! indicators are served as of the latest observation on or before the
//! requested date.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::ports::{
    FundamentalIndicator, FundamentalSource, PortError, Price, PriceSource, StockProfile,
    TechnicalIndicator, TradingCalendar, UniverseCriteria, UniverseSource,
};

type Series<T> = HashMap<String, BTreeMap<NaiveDate, T>>;

fn as_of<'a, T>(series: &'a Series<T>, stock_code: &str, date: NaiveDate) -> Option<&'a T> {
    series
        .get(stock_code)?
        .range(..=date)
        .next_back()
        .map(|(_, v)| v)
}

/// Market data held in memory
#[derive(Debug, Clone)]
pub struct InMemoryMarketData {
    prices: Series<Price>,
    fundamentals: Series<FundamentalIndicator>,
    indicators: Series<TechnicalIndicator>,
    profiles: BTreeMap<String, StockProfile>,
    holidays: BTreeSet<NaiveDate>,
    weekends_closed: bool,
    failing: HashSet<String>,
}

impl Default for InMemoryMarketData {
    fn default() -> Self {
        Self {
            prices: HashMap::new(),
            fundamentals: HashMap::new(),
            indicators: HashMap::new(),
            profiles: BTreeMap::new(),
            holidays: BTreeSet::new(),
            weekends_closed: true,
            failing: HashSet::new(),
        }
    }
}

impl InMemoryMarketData {
    /// Empty data set; Saturdays and Sundays are non-trading days
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat weekends as trading days
    pub fn with_weekends_open(mut self) -> Self {
        self.weekends_closed = false;
        self
    }

    pub fn add_price(&mut self, price: Price) {
        self.prices
            .entry(price.stock_code.clone())
            .or_default()
            .insert(price.date, price);
    }

    /// Add a bare close with no volume or market cap
    pub fn add_close(&mut self, stock_code: &str, date: NaiveDate, close: Decimal) {
        self.add_price(Price {
            stock_code: stock_code.to_string(),
            date,
            close,
            volume: None,
            market_cap: None,
        });
    }

    pub fn add_fundamental(&mut self, indicator: FundamentalIndicator) {
        self.fundamentals
            .entry(indicator.stock_code.clone())
            .or_default()
            .insert(indicator.date, indicator);
    }

    pub fn add_indicator(&mut self, indicator: TechnicalIndicator) {
        self.indicators
            .entry(indicator.stock_code.clone())
            .or_default()
            .insert(indicator.date, indicator);
    }

    pub fn add_profile(&mut self, profile: StockProfile) {
        self.profiles.insert(profile.stock_code.clone(), profile);
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Make every price lookup for `stock_code` fail
    pub fn fail_lookups_for(&mut self, stock_code: &str) {
        self.failing.insert(stock_code.to_string());
    }

    fn check(&self, stock_code: &str) -> Result<(), PortError> {
        if self.failing.contains(stock_code) {
            return Err(PortError::Backend(format!("lookup failed for {stock_code}")));
        }
        Ok(())
    }

    fn passes(&self, profile: &StockProfile, date: NaiveDate, criteria: &UniverseCriteria) -> bool {
        let code = profile.stock_code.as_str();
        if let Some(market) = &criteria.market {
            if !profile.market.eq_ignore_ascii_case(market) {
                return false;
            }
        }
        if criteria.exclude_sectors.iter().any(|s| s == &profile.sector) {
            return false;
        }

        let Some(price) = as_of(&self.prices, code, date) else {
            return false;
        };
        let (min_cap, max_cap) = criteria.market_cap_bounds();
        if min_cap.is_some() || max_cap.is_some() {
            let Some(cap) = price.market_cap else {
                return false;
            };
            if min_cap.is_some_and(|min| cap < min) || max_cap.is_some_and(|max| cap > max) {
                return false;
            }
        }
        if let Some(min_volume) = criteria.min_trading_volume {
            if price.volume.map_or(true, |v| v < Decimal::from(min_volume)) {
                return false;
            }
        }

        let Some(custom) = &criteria.custom else {
            return true;
        };
        let fundamental = as_of(&self.fundamentals, code, date);
        let technical = as_of(&self.indicators, code, date);
        let field = |get: fn(&FundamentalIndicator) -> Option<Decimal>| fundamental.and_then(get);
        let at_least = |value: Option<Decimal>, bound: Option<Decimal>| {
            bound.map_or(true, |b| value.is_some_and(|v| v >= b))
        };
        let at_most = |value: Option<Decimal>, bound: Option<Decimal>| {
            bound.map_or(true, |b| value.is_some_and(|v| v <= b))
        };

        at_least(field(|f| f.per), custom.min_per)
            && at_most(field(|f| f.per), custom.max_per)
            && at_least(field(|f| f.pbr), custom.min_pbr)
            && at_most(field(|f| f.pbr), custom.max_pbr)
            && at_least(field(|f| f.roe), custom.min_roe)
            && at_least(technical.and_then(|t| t.momentum_6m), custom.min_momentum_6m)
            && match custom.price_above_ma20 {
                Some(true) => technical
                    .and_then(|t| t.ma20)
                    .is_some_and(|ma| price.close > ma),
                _ => true,
            }
    }
}

#[async_trait]
impl PriceSource for InMemoryMarketData {
    async fn price_on(
        &self,
        stock_code: &str,
        date: NaiveDate,
    ) -> Result<Option<Price>, PortError> {
        self.check(stock_code)?;
        Ok(self
            .prices
            .get(stock_code)
            .and_then(|series| series.get(&date))
            .cloned())
    }

    async fn price_history(
        &self,
        stock_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Price>, PortError> {
        self.check(stock_code)?;
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .prices
            .get(stock_code)
            .map(|series| series.range(start..=end).map(|(_, p)| p.clone()).collect())
            .unwrap_or_default())
    }

    async fn indicators_batch(
        &self,
        stock_codes: &[String],
        date: NaiveDate,
    ) -> Result<Vec<TechnicalIndicator>, PortError> {
        Ok(stock_codes
            .iter()
            .filter_map(|code| as_of(&self.indicators, code, date).cloned())
            .collect())
    }
}

#[async_trait]
impl FundamentalSource for InMemoryMarketData {
    async fn fundamentals_batch(
        &self,
        stock_codes: &[String],
        date: NaiveDate,
    ) -> Result<Vec<FundamentalIndicator>, PortError> {
        Ok(stock_codes
            .iter()
            .filter_map(|code| as_of(&self.fundamentals, code, date).cloned())
            .collect())
    }
}

#[async_trait]
impl UniverseSource for InMemoryMarketData {
    async fn filter_universe(
        &self,
        date: NaiveDate,
        criteria: &UniverseCriteria,
    ) -> Result<Vec<String>, PortError> {
        Ok(self
            .profiles
            .values()
            .filter(|p| self.passes(p, date, criteria))
            .map(|p| p.stock_code.clone())
            .collect())
    }

    async fn profiles(&self, stock_codes: &[String]) -> Result<Vec<StockProfile>, PortError> {
        Ok(stock_codes
            .iter()
            .filter_map(|code| self.profiles.get(code).cloned())
            .collect())
    }
}

#[async_trait]
impl TradingCalendar for InMemoryMarketData {
    async fn is_non_trading_day(&self, date: NaiveDate) -> Result<bool, PortError> {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        Ok((self.weekends_closed && weekend) || self.holidays.contains(&date))
    }
}
