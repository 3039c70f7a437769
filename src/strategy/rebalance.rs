//! Order generation shared by the strategies

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::execution::TradeOrder;
use crate::portfolio::{round_currency, Portfolio};
use crate::ports::PriceSource;
use crate::telemetry::{increment_counter, CounterMetric};

/// Quoted close for `stock_code` on `date`, skipping failed or missing lookups
pub(crate) async fn quote(
    prices: &dyn PriceSource,
    stock_code: &str,
    date: NaiveDate,
) -> Option<Decimal> {
    match prices.price_on(stock_code, date).await {
        Ok(Some(price)) if price.close > Decimal::ZERO => Some(price.close),
        Ok(_) => {
            tracing::debug!(stock_code, %date, "No price, skipping");
            None
        }
        Err(e) => {
            increment_counter(CounterMetric::SkippedLookup);
            tracing::warn!(stock_code, %date, error = %e, "Price lookup failed, skipping");
            None
        }
    }
}

/// Order moving one position from its current value to `target_value`.
///
/// No order when the gap is not larger than one share's price.
pub(crate) fn delta_order(
    stock_code: &str,
    target_value: Decimal,
    held_quantity: u64,
    price: Decimal,
    date: NaiveDate,
) -> Option<TradeOrder> {
    if price <= Decimal::ZERO {
        return None;
    }
    let current_value = price * Decimal::from(held_quantity);
    let diff = target_value - current_value;
    if diff.abs() <= price {
        return None;
    }

    let quantity = (diff.abs() / price).floor().to_u64()?;
    if quantity == 0 {
        return None;
    }
    if diff > Decimal::ZERO {
        Some(TradeOrder::buy(stock_code, quantity, price, date))
    } else if held_quantity >= quantity {
        Some(TradeOrder::sell(stock_code, quantity, price, date))
    } else {
        None
    }
}

/// Full-quantity sells for every holding not in `keep`
pub(crate) fn liquidate_outside(
    portfolio: &Portfolio,
    keep: &HashSet<&str>,
    date: NaiveDate,
) -> Vec<TradeOrder> {
    portfolio
        .holdings()
        .filter(|h| !keep.contains(h.stock_code.as_str()))
        .map(|h| TradeOrder::sell(&h.stock_code, h.quantity, h.current_price, date))
        .collect()
}

/// Orders realizing per-stock target values.
///
/// Holdings outside `targets` are liquidated. Sells come before buys so that
/// released cash is available to the buys.
pub(crate) async fn target_value_orders(
    prices: &dyn PriceSource,
    date: NaiveDate,
    portfolio: &Portfolio,
    targets: &[(String, Decimal)],
) -> Vec<TradeOrder> {
    let keep: HashSet<&str> = targets.iter().map(|(code, _)| code.as_str()).collect();
    let mut sells = liquidate_outside(portfolio, &keep, date);
    let mut buys = Vec::new();

    for (code, target) in targets {
        let Some(price) = quote(prices, code, date).await else {
            continue;
        };
        if let Some(order) = delta_order(code, *target, portfolio.quantity(code), price, date) {
            match order.side {
                crate::execution::Side::Buy => buys.push(order),
                crate::execution::Side::Sell => sells.push(order),
            }
        }
    }

    sells.extend(buys);
    sells
}

/// Equal-value allocation of total portfolio value over `selected`.
///
/// An empty selection produces no orders.
pub(crate) async fn equal_weight_orders(
    prices: &dyn PriceSource,
    date: NaiveDate,
    portfolio: &Portfolio,
    selected: &[String],
) -> Vec<TradeOrder> {
    if selected.is_empty() {
        return Vec::new();
    }
    let per_stock = round_currency(portfolio.total_value() / Decimal::from(selected.len()));
    let targets: Vec<(String, Decimal)> = selected
        .iter()
        .map(|code| (code.clone(), per_stock))
        .collect();
    target_value_orders(prices, date, portfolio, &targets).await
}

/// Best `n` codes under `cmp`, ties broken by stock code ascending
pub(crate) fn select_top<S>(
    mut scored: Vec<(String, S)>,
    n: usize,
    cmp: impl Fn(&S, &S) -> Ordering,
) -> Vec<String> {
    scored.sort_by(|(code_a, a), (code_b, b)| cmp(a, b).then_with(|| code_a.cmp(code_b)));
    scored.into_iter().take(n).map(|(code, _)| code).collect()
}
