use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Market clock (hour, minute) in `market_tz`
    pub market_tz: Tz,
    pub market_open: (u32, u32),
    pub market_close: (u32, u32),

    // Experience classification
    pub experience_lookback_days: i64,
    pub min_trades_for_auto: usize,

    // Move aggregation: weight of trades exited inside the lookback window
    pub recent_weight: f64,

    // Position planner (as fractions, e.g. 0.05 = 5%)
    pub default_stop_pct: f64,
    pub reward_risk_ratio: f64,
    pub level_buffer_pct: f64,
    pub max_position_pct: f64,

    // Journal analytics
    pub min_sample_per_bucket: usize,

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            market_tz: chrono_tz::America::New_York,
            market_open: (9, 30),
            market_close: (16, 0),
            experience_lookback_days: 90,
            min_trades_for_auto: 10,
            recent_weight: 1.5,
            default_stop_pct: 0.05,
            reward_risk_ratio: 3.0,
            level_buffer_pct: 0.02,
            max_position_pct: 0.10,
            min_sample_per_bucket: 10,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str| -> Option<String> { std::env::var(key).ok() };
        let defaults = Config::default();

        Config {
            market_tz: env("TRADE_JOURNAL_MARKET_TZ")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.market_tz),
            market_open: env("TRADE_JOURNAL_MARKET_OPEN")
                .and_then(|s| parse_hhmm(&s))
                .unwrap_or(defaults.market_open),
            market_close: env("TRADE_JOURNAL_MARKET_CLOSE")
                .and_then(|s| parse_hhmm(&s))
                .unwrap_or(defaults.market_close),
            experience_lookback_days: env("TRADE_JOURNAL_LOOKBACK_DAYS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.experience_lookback_days),
            min_trades_for_auto: env("TRADE_JOURNAL_MIN_TRADES_FOR_AUTO")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_trades_for_auto),
            recent_weight: env("TRADE_JOURNAL_RECENT_WEIGHT")
                .and_then(|s| parse_positive(&s))
                .unwrap_or(defaults.recent_weight),
            default_stop_pct: env("TRADE_JOURNAL_DEFAULT_STOP_PCT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_stop_pct),
            reward_risk_ratio: env("TRADE_JOURNAL_REWARD_RISK")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reward_risk_ratio),
            level_buffer_pct: env("TRADE_JOURNAL_LEVEL_BUFFER_PCT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.level_buffer_pct),
            max_position_pct: env("TRADE_JOURNAL_MAX_POSITION_PCT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_position_pct),
            min_sample_per_bucket: env("TRADE_JOURNAL_MIN_SAMPLE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_sample_per_bucket),
            log_level: env("TRADE_JOURNAL_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

/// "HH:MM" -> (hour, minute)
fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some((h, m))
}

/// Weights and ratios must be finite and > 0.
fn parse_positive(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}
