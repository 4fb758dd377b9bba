use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use trade_journal::models::{Direction, PostExitAnalysis, ProfitLoss, Trade, TradeStatus};

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

pub fn closed_trade(
    direction: Direction,
    entry_price: f64,
    exit_price: f64,
    realized: f64,
    exit_time: DateTime<Utc>,
) -> Trade {
    Trade {
        id: None,
        symbol: Some("NQ".to_string()),
        entry_date: exit_time - Duration::minutes(20),
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

/// Adds post-exit extremes and their timing, as minute offsets from the exit.
pub fn with_post_exit(
    mut trade: Trade,
    high: f64,
    low: f64,
    minutes_to_high: i64,
    minutes_to_low: i64,
) -> Trade {
    let exit = trade.exit_date.unwrap();
    trade.post_exit_high = Some(high);
    trade.post_exit_low = Some(low);
    trade.post_exit_analysis = Some(PostExitAnalysis {
        time_of_high: Some(exit + Duration::minutes(minutes_to_high)),
        time_of_low: Some(exit + Duration::minutes(minutes_to_low)),
        low_before_high: None,
    });
    trade
}

/// A mixed month of trading: winners, losers, some with post-exit data.
pub fn sample_journal() -> Vec<Trade> {
    let mut trades = Vec::new();
    for day in 3..=21u32 {
        let weekday_ok = !matches!(day, 8 | 9 | 15 | 16);
        if !weekday_ok {
            continue;
        }
        let exit = ny(2024, 6, day, if day % 2 == 0 { 9 } else { 13 }, 50);
        let t = if day % 3 == 0 {
            closed_trade(Direction::Short, 200.0, 203.0, -300.0, exit)
        } else {
            closed_trade(Direction::Long, 200.0, 204.0, 400.0, exit)
        };
        let t = if day % 2 == 0 {
            with_post_exit(t, 207.0, 199.0, 6, 40)
        } else {
            t
        };
        trades.push(t);
    }
    trades
}
