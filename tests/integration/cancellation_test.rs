//! Cancellation and failure isolation

use equity_backtest::data::InMemoryMarketData;
use equity_backtest::engine::SimulationStatus;
use rust_decimal_macros::dec;

use crate::common::{listed, service, simulation, wait_terminal};

const DAILY: &str = r#"
    start_date = "2024-01-01"
    end_date = "2024-12-31"
    initial_capital = 1000000
    rebalancing_period = "daily"

    [strategy]
    type = "equal_weight"
"#;

#[tokio::test]
async fn test_cancel_queued_run() {
    let mut data = InMemoryMarketData::new();
    listed(&mut data, "AAA", "Tech", |_| dec!(100));
    let service = service(data, 1);

    // the spawned run cannot start before this task yields
    let id = service.start_simulation(simulation(DAILY)).await.unwrap();
    assert!(service.cancel(id).await.unwrap());

    assert_eq!(wait_terminal(&service, id).await, SimulationStatus::Failed);
    let record = service.get_status(id).await.unwrap();
    assert!(record.message.unwrap().contains("cancelled"));
    assert!(service.get_result(id).await.unwrap().is_none());
    assert!(service.get_snapshots(id, None).await.unwrap().is_empty());

    // finished runs report false
    assert!(!service.cancel(id).await.unwrap());
}

#[tokio::test]
async fn test_cancel_one_run_leaves_others() {
    let mut data = InMemoryMarketData::new();
    listed(&mut data, "AAA", "Tech", |_| dec!(100));
    let service = service(data, 2);

    let cancelled = service.start_simulation(simulation(DAILY)).await.unwrap();
    let kept = service.start_simulation(simulation(DAILY)).await.unwrap();
    service.cancel(cancelled).await.unwrap();

    assert_eq!(wait_terminal(&service, cancelled).await, SimulationStatus::Failed);
    assert_eq!(wait_terminal(&service, kept).await, SimulationStatus::Completed);
    assert!(service.get_result(kept).await.unwrap().is_some());
}

#[tokio::test]
async fn test_failing_price_port_isolated_to_stock() {
    let mut data = InMemoryMarketData::new();
    listed(&mut data, "GOOD", "Tech", |_| dec!(100));
    listed(&mut data, "BROKEN", "Tech", |_| dec!(100));
    data.fail_lookups_for("BROKEN");
    let service = service(data, 1);

    let result = tokio_test::assert_ok!(service.run_simulation(simulation(DAILY)).await);
    let trades = service.get_trades(result.simulation_id).await.unwrap();
    assert!(!trades.is_empty());
    assert!(trades.iter().all(|t| t.stock_code == "GOOD"));
}
