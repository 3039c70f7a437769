//! Shared fixtures

use chrono::{Datelike, NaiveDate, Weekday};
use equity_backtest::config::{EngineConfig, SimulationConfig};
use equity_backtest::data::{InMemoryMarketData, InMemoryStore};
use equity_backtest::engine::{SimulationId, SimulationStatus};
use equity_backtest::ports::{FundamentalIndicator, MarketPorts, StockProfile, TechnicalIndicator};
use equity_backtest::service::BacktestService;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

pub fn profile(code: &str, sector: &str) -> StockProfile {
    StockProfile {
        stock_code: code.to_string(),
        name: format!("{code} Corp"),
        market: "KOSPI".to_string(),
        sector: sector.to_string(),
    }
}

/// Listed stock with a close on every weekday of 2024 from `price(day_index)`
pub fn listed(data: &mut InMemoryMarketData, code: &str, sector: &str, price: impl Fn(usize) -> Decimal) {
    data.add_profile(profile(code, sector));
    for (i, day) in weekdays(date(2024, 1, 1), date(2024, 12, 31)).into_iter().enumerate() {
        data.add_close(code, day, price(i));
    }
}

pub fn factors(data: &mut InMemoryMarketData, code: &str, per: Decimal, roe: Decimal, momentum: Decimal) {
    data.add_fundamental(FundamentalIndicator {
        stock_code: code.to_string(),
        date: date(2023, 12, 31),
        per: Some(per),
        pbr: Some(Decimal::ONE),
        roe: Some(roe),
    });
    data.add_indicator(TechnicalIndicator {
        stock_code: code.to_string(),
        date: date(2023, 12, 31),
        momentum_6m: Some(momentum),
        ma20: None,
        bollinger_upper: None,
        bollinger_lower: None,
    });
}

pub fn simulation(body: &str) -> SimulationConfig {
    toml::from_str(body).unwrap()
}

pub fn service(data: InMemoryMarketData, workers: usize) -> BacktestService<InMemoryStore> {
    BacktestService::new(
        MarketPorts::from_source(Arc::new(data)),
        Arc::new(InMemoryStore::new()),
        &EngineConfig {
            max_concurrent_runs: Some(workers),
        },
    )
}

pub async fn wait_terminal(service: &BacktestService<InMemoryStore>, id: SimulationId) -> SimulationStatus {
    for _ in 0..500 {
        let status = service.get_status(id).await.unwrap().status;
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("simulation {id} did not finish");
}
