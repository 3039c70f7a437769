//! Rebalancing and snapshot calendar rules
//!
//! Pure functions of their arguments; no calendar port is consulted here.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// How often the strategy is asked to rebalance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalancingPeriod {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

/// True when `date` triggers a rebalance.
///
/// The start date always rebalances. Otherwise: every day for DAILY, Mondays
/// for WEEKLY, the 1st for MONTHLY, the 1st of Jan/Apr/Jul/Oct for QUARTERLY,
/// and January 1st for YEARLY.
pub fn is_rebalancing_date(date: NaiveDate, period: RebalancingPeriod, start_date: NaiveDate) -> bool {
    if date == start_date {
        return true;
    }
    match period {
        RebalancingPeriod::Daily => true,
        RebalancingPeriod::Weekly => date.weekday() == Weekday::Mon,
        RebalancingPeriod::Monthly => date.day() == 1,
        RebalancingPeriod::Quarterly => date.day() == 1 && date.month() % 3 == 1,
        RebalancingPeriod::Yearly => date.day() == 1 && date.month() == 1,
    }
}

/// True when `date` is the last calendar day of its month
pub fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// True when a snapshot should be persisted for `date`
pub fn is_snapshot_date(date: NaiveDate, period: RebalancingPeriod, start_date: NaiveDate) -> bool {
    is_rebalancing_date(date, period, start_date) || is_month_end(date)
}

/// Calendar days to request so that `trading_days` closes are likely covered
pub fn calendar_lookback(trading_days: usize) -> chrono::Days {
    chrono::Days::new((trading_days * 3 / 2 + 20) as u64)
}
