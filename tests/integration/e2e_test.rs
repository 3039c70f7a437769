//! End-to-end simulation runs

use chrono::{Datelike, Weekday};
use equity_backtest::analytics::StrategyComparison;
use equity_backtest::data::{Dataset, InMemoryMarketData};
use equity_backtest::engine::SimulationStatus;
use equity_backtest::execution::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;

use crate::common::{date, factors, listed, profile, service, simulation};

#[tokio::test]
async fn test_flat_market_preserves_capital() {
    let mut data = InMemoryMarketData::new();
    listed(&mut data, "AAA", "Tech", |_| dec!(100));
    listed(&mut data, "BBB", "Energy", |_| dec!(250));
    let service = service(data, 2);

    let config = simulation(
        r#"
        start_date = "2024-01-01"
        end_date = "2024-12-31"
        initial_capital = 1000000
        rebalancing_period = "daily"
        fee_rate = 0
        tax_rate = 0

        [strategy]
        type = "equal_weight"
        "#,
    );
    let result = service.run_simulation(config).await.unwrap();
    let id = result.simulation_id;

    assert_eq!(result.strategy, "equal_weight");
    assert_eq!(result.slippage_model, "none");
    assert_eq!(result.metrics.final_value, dec!(1000000));
    assert_eq!(result.metrics.total_return, dec!(0));
    assert_eq!(result.metrics.max_drawdown, dec!(0));
    assert_eq!(result.metrics.sharpe_ratio, dec!(0));
    assert_eq!(result.metrics.volatility, dec!(0));

    let snapshots = service.get_snapshots(id, None).await.unwrap();
    assert!(!snapshots.is_empty());
    for window in snapshots.windows(2) {
        assert!(window[0].date < window[1].date);
    }
    for snapshot in &snapshots {
        assert!(!matches!(snapshot.date.weekday(), Weekday::Sat | Weekday::Sun));
        assert_eq!(snapshot.valuation_gap(), dec!(0));
        assert!(snapshot.cash_balance >= dec!(0));
    }

    // 500,000 per stock on the first day, nothing afterwards
    let trades = service.get_trades(id).await.unwrap();
    assert_eq!(trades.len(), 2);
    assert!(trades.iter().all(|t| t.side == Side::Buy && t.date == date(2024, 1, 1)));
    assert_eq!(service.get_status(id).await.unwrap().status, SimulationStatus::Completed);
}

#[tokio::test]
async fn test_rising_market_with_costs() {
    let mut data = InMemoryMarketData::new();
    listed(&mut data, "UP", "Tech", |i| dec!(100) + Decimal::from(i));
    listed(&mut data, "DOWN", "Tech", |i| dec!(400) - Decimal::from(i));
    let service = service(data, 2);

    let config = simulation(
        r#"
        start_date = "2024-01-01"
        end_date = "2024-06-28"
        initial_capital = 10000000
        rebalancing_period = "monthly"

        [slippage]
        model = "fixed"
        rate = 0.001

        [strategy]
        type = "equal_weight"
        "#,
    );
    let result = service.run_simulation(config).await.unwrap();
    let trades = service.get_trades(result.simulation_id).await.unwrap();

    assert_eq!(result.slippage_model, "fixed");
    assert!(trades.iter().all(|t| t.fee > dec!(0)));
    assert!(trades
        .iter()
        .filter(|t| t.side == Side::Buy)
        .all(|t| t.execution_price > t.reference_price));
    let sells: Vec<_> = trades.iter().filter(|t| t.side == Side::Sell).collect();
    assert!(!sells.is_empty());
    assert!(sells.iter().all(|t| t.tax > dec!(0) && t.execution_price < t.reference_price));
    // sells go out before buys on the same day
    for pair in trades.windows(2) {
        if pair[0].date == pair[1].date {
            assert!(!(pair[0].side == Side::Buy && pair[1].side == Side::Sell));
        }
    }
    assert_eq!(result.metrics.buy_trades + result.metrics.sell_trades, trades.len());
}

#[tokio::test]
async fn test_multi_factor_persists_scores_and_compares() {
    let mut data = InMemoryMarketData::new();
    for (code, per, roe, momentum) in [
        ("GOOD", dec!(5), dec!(20), dec!(30)),
        ("MID", dec!(10), dec!(10), dec!(0)),
        ("BAD", dec!(30), dec!(2), dec!(-20)),
    ] {
        listed(&mut data, code, "Industrials", |_| dec!(1000));
        factors(&mut data, code, per, roe, momentum);
    }
    let service = service(data, 2);

    let multi = simulation(
        r#"
        start_date = "2024-01-01"
        end_date = "2024-03-29"
        initial_capital = 1000000
        rebalancing_period = "monthly"

        [strategy]
        type = "multi_factor"
        top_n = 1
        "#,
    );
    let equal = simulation(
        r#"
        start_date = "2024-01-01"
        end_date = "2024-03-29"
        initial_capital = 1000000
        rebalancing_period = "monthly"

        [strategy]
        type = "equal_weight"
        "#,
    );

    let first = service.run_simulation(multi).await.unwrap();
    let second = service.run_simulation(equal).await.unwrap();

    let trades = service.get_trades(first.simulation_id).await.unwrap();
    assert!(trades.iter().all(|t| t.stock_code == "GOOD"));
    let scores = service.get_factor_scores(first.simulation_id).await.unwrap();
    assert!(!scores.is_empty());
    assert!(scores.iter().any(|s| s.stock_code == "BAD"));

    let ids = [first.simulation_id, second.simulation_id];
    let comparison: StrategyComparison = service.compare(&ids).await.unwrap();
    assert_eq!(comparison.compared, 2);
    assert!(comparison.best_cagr.is_some());
    assert!(comparison.lowest_mdd.is_some());
}

#[tokio::test]
async fn test_dataset_file_drives_run() {
    let mut dataset = Dataset::default();
    dataset.stocks.push(profile("AAA", "Tech"));
    dataset.holidays.push(date(2024, 1, 3));
    for day in [2, 3, 4, 5] {
        dataset.prices.push(equity_backtest::ports::Price {
            stock_code: "AAA".to_string(),
            date: date(2024, 1, day),
            close: dec!(100),
            volume: Some(dec!(10000)),
            market_cap: None,
        });
    }

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&dataset).unwrap().as_bytes())
        .unwrap();

    let data = Dataset::load(file.path()).unwrap().into_market_data();
    let service = service(data, 1);
    let config = simulation(
        r#"
        start_date = "2024-01-02"
        end_date = "2024-01-05"
        initial_capital = 100000
        rebalancing_period = "daily"
        fee_rate = 0
        tax_rate = 0

        [strategy]
        type = "equal_weight"
        "#,
    );

    let result = service.run_simulation(config).await.unwrap();
    let snapshots = service.get_snapshots(result.simulation_id, None).await.unwrap();
    let dates: Vec<_> = snapshots.iter().map(|s| s.date).collect();
    // the holiday is skipped
    assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 4), date(2024, 1, 5)]);
}
