use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;

use crate::config::Config;
use crate::models::{Direction, PostExitAnalysis, ProfitLoss, Trade, TradeStatus};

/// Reference "now" for tests: Friday 2024-06-28, after the close.
pub fn as_of() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-28T21:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// A New York wall-clock time converted to UTC.
pub fn ny(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap();
    New_York
        .from_local_datetime(&naive)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

/// A closed trade held for 30 minutes before `exit_time`.
pub fn closed_trade(
    direction: Direction,
    entry_price: f64,
    exit_price: f64,
    realized: f64,
    exit_time: DateTime<Utc>,
) -> Trade {
    Trade {
        id: None,
        symbol: Some("TEST".to_string()),
        entry_date: exit_time - Duration::minutes(30),
        exit_date: Some(exit_time),
        entry_price,
        exit_price: Some(exit_price),
        direction,
        status: TradeStatus::Closed,
        profit_loss: ProfitLoss { realized },
        post_exit_high: None,
        post_exit_low: None,
        post_exit_analysis: None,
    }
}

/// Closed trades exiting at 12:00 New York time, one per day going back from `as_of`.
pub fn recent_trades(pnls: &[f64]) -> Vec<Trade> {
    pnls.iter()
        .enumerate()
        .map(|(i, &pnl)| {
            let exit = ny(2024, 6, 27, 12, 0) - Duration::days(i as i64);
            let (entry, exit_price) = if pnl >= 0.0 { (100.0, 101.0) } else { (100.0, 99.0) };
            closed_trade(Direction::Long, entry, exit_price, pnl, exit)
        })
        .collect()
}

pub fn with_post_exit(mut trade: Trade, high: f64, low: f64) -> Trade {
    trade.post_exit_high = Some(high);
    trade.post_exit_low = Some(low);
    trade
}

/// Post-exit extreme timestamps as minute offsets from the exit.
pub fn with_post_exit_times(mut trade: Trade, minutes_to_high: i64, minutes_to_low: i64) -> Trade {
    let exit = trade.exit_date.unwrap();
    trade.post_exit_analysis = Some(PostExitAnalysis {
        time_of_high: Some(exit + Duration::minutes(minutes_to_high)),
        time_of_low: Some(exit + Duration::minutes(minutes_to_low)),
        low_before_high: None,
    });
    trade
}

pub fn default_test_config() -> Config {
    Config {
        log_level: "error".to_string(),
        ..Config::default()
    }
}
