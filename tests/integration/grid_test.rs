//! Grid search through the service

use equity_backtest::config::{ConfigError, GridSearchConfig};
use equity_backtest::data::InMemoryMarketData;
use equity_backtest::engine::SimulationStatus;
use equity_backtest::service::ServiceError;
use rust_decimal_macros::dec;

use crate::common::{factors, listed, service, simulation, wait_terminal};

fn market() -> InMemoryMarketData {
    let mut data = InMemoryMarketData::new();
    for (code, per, roe) in [("A", dec!(6), dec!(15)), ("B", dec!(12), dec!(8)), ("C", dec!(20), dec!(3))] {
        listed(&mut data, code, "Tech", |_| dec!(100));
        factors(&mut data, code, per, roe, dec!(5));
    }
    data
}

const VALUE: &str = r#"
    start_date = "2024-01-01"
    end_date = "2024-02-29"
    initial_capital = 1000000
    rebalancing_period = "monthly"

    [strategy]
    type = "value"
    top_n = 2
"#;

#[tokio::test]
async fn test_value_grid_covers_weight_simplex() {
    let service = service(market(), 3);
    let ranges = GridSearchConfig {
        min_top_n: 1,
        max_top_n: 2,
        step_top_n: 1,
        weight_step: Some(dec!(0.5)),
    };

    let outcomes = service
        .run_grid_search(&simulation(VALUE), &ranges)
        .await
        .unwrap();
    // two top-N values times six weight triples
    assert_eq!(outcomes.len(), 12);

    for outcome in &outcomes {
        let result = outcome.result.as_ref().unwrap();
        assert!(result.is_optimized);
        assert_eq!(result.strategy, "value");
        let record = service.get_status(outcome.simulation_id).await.unwrap();
        assert_eq!(record.status, SimulationStatus::Completed);
        assert!(record.config.is_optimized);
    }

    let ids: Vec<_> = outcomes.iter().map(|o| o.simulation_id).collect();
    let comparison = service.compare(&ids).await.unwrap();
    assert_eq!(comparison.compared, 12);
}

#[tokio::test]
async fn test_background_grid_with_single_worker() {
    let service = service(market(), 1);
    let ranges = GridSearchConfig {
        min_top_n: 1,
        max_top_n: 3,
        step_top_n: 1,
        weight_step: None,
    };

    let ids = service
        .start_grid_search(&simulation(VALUE), &ranges)
        .await
        .unwrap();
    assert_eq!(ids.len(), 3);
    for id in ids {
        assert_eq!(wait_terminal(&service, id).await, SimulationStatus::Completed);
    }
}

#[tokio::test]
async fn test_equal_weight_is_not_tunable() {
    let service = service(market(), 2);
    let base = simulation(
        r#"
        start_date = "2024-01-01"
        end_date = "2024-02-29"
        initial_capital = 1000000
        rebalancing_period = "monthly"

        [strategy]
        type = "equal_weight"
        "#,
    );

    let err = tokio_test::assert_err!(
        service
            .run_grid_search(&base, &GridSearchConfig::default())
            .await
    );
    assert!(matches!(
        err,
        ServiceError::Config(ConfigError::NotTunable("equal_weight"))
    ));
}
