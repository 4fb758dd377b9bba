use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::config::Config;
use crate::models::TradingSession;

/// Morning session ends at 10:00, closing session starts 30 minutes before the close.
const MORNING_END_MIN: u32 = 10 * 60;
const CLOSING_WINDOW_MIN: u32 = 30;

/// Converts UTC timestamps into exchange wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct MarketClock {
    tz: Tz,
    open_min: u32,
    close_min: u32,
}

impl MarketClock {
    pub fn new(cfg: &Config) -> Self {
        Self {
            tz: cfg.market_tz,
            open_min: cfg.market_open.0 * 60 + cfg.market_open.1,
            close_min: cfg.market_close.0 * 60 + cfg.market_close.1,
        }
    }

    pub fn minute_of_day(&self, t: DateTime<Utc>) -> u32 {
        let local = t.with_timezone(&self.tz);
        local.hour() * 60 + local.minute()
    }

    /// Decimal hour, e.g. 09:45 -> 9.75.
    pub fn hour_of_day(&self, t: DateTime<Utc>) -> f64 {
        let local = t.with_timezone(&self.tz);
        local.hour() as f64 + local.minute() as f64 / 60.0 + local.second() as f64 / 3600.0
    }

    /// Negative once the close has passed.
    pub fn minutes_until_close(&self, t: DateTime<Utc>) -> i64 {
        self.close_min as i64 - self.minute_of_day(t) as i64
    }

    /// Inside the last `window` minutes before the close, close included.
    pub fn is_near_close(&self, t: DateTime<Utc>, window: i64) -> bool {
        (0..=window).contains(&self.minutes_until_close(t))
    }

    pub fn session(&self, t: DateTime<Utc>) -> TradingSession {
        let m = self.minute_of_day(t);
        let closing_start = self.close_min.saturating_sub(CLOSING_WINDOW_MIN);
        if m < self.open_min {
            TradingSession::Premarket
        } else if m < MORNING_END_MIN.max(self.open_min) {
            TradingSession::Morning
        } else if m < closing_start {
            TradingSession::Midday
        } else if m <= self.close_min {
            TradingSession::Closing
        } else {
            TradingSession::AfterHours
        }
    }

    pub fn day_of_week(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.tz).format("%A").to_string()
    }
}
