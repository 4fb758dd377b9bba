use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::core::market_hours::MarketClock;
use crate::models::{Direction, Trade};

/// Post-exit excursion must beat the realized move by 10% before it is blended in.
const POTENTIAL_BLEND_THRESHOLD: f64 = 1.1;
const REALIZED_BLEND_WEIGHT: f64 = 0.6;
const POTENTIAL_BLEND_WEIGHT: f64 = 0.4;

const NEAR_CLOSE_WINDOW_MIN: i64 = 30;
const NEAR_CLOSE_DAMPENER: f64 = 0.8;

const RECOVERY_THRESHOLD: f64 = 0.5;
const RECOVERY_DAMPENER: f64 = 0.8;

const STRONG_MOMENTUM: f64 = 0.02;
const WEAK_MOMENTUM: f64 = 0.01;
const TARGET_MOMENTUM_BOOST: f64 = 1.2;
const TARGET_MOMENTUM_CUT: f64 = 0.9;
const STOP_MOMENTUM_BOOST: f64 = 1.15;
const STOP_MOMENTUM_CUT: f64 = 0.85;

/// Stop may be at most this fraction of the target after reconciliation.
pub const MAX_STOP_TO_TARGET: f64 = 0.4;
const RECONCILE_DIVISOR: f64 = 1.5;

/// How quickly and durably price moved after a trade's exit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSignals {
    pub trend_strength: f64,
    pub timing_quality: f64,
}

impl TradeSignals {
    pub const NEUTRAL: TradeSignals = TradeSignals {
        trend_strength: 1.0,
        timing_quality: 1.0,
    };

    pub fn combined(&self) -> f64 {
        self.trend_strength * self.timing_quality
    }
}

impl Default for TradeSignals {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

/// Trend strength and timing quality from the post-exit timestamps.
/// Neutral when the trade has no timestamps.
pub fn trade_signals(trade: &Trade, clock: &MarketClock) -> TradeSignals {
    let (exit, _) = match trade.closed_exit() {
        Some(e) => e,
        None => return TradeSignals::NEUTRAL,
    };
    let (time_of_high, time_of_low) = match trade.post_exit_times() {
        Some(t) => t,
        None => return TradeSignals::NEUTRAL,
    };

    let to_high = minutes_between(exit, time_of_high);
    let to_low = minutes_between(exit, time_of_low);
    let (to_favorable, to_adverse) = match trade.direction {
        Direction::Long => (to_high, to_low),
        Direction::Short => (to_low, to_high),
    };

    let mut signals = TradeSignals::NEUTRAL;

    if to_favorable <= 15.0 {
        signals.timing_quality *= 1.3;
    } else if to_favorable <= 30.0 {
        signals.timing_quality *= 1.1;
    }

    if to_adverse >= 90.0 {
        signals.trend_strength *= 1.2;
    } else if to_adverse <= 15.0 {
        signals.trend_strength *= 0.7;
    }

    if clock.is_near_close(exit, NEAR_CLOSE_WINDOW_MIN) {
        signals.timing_quality *= NEAR_CLOSE_DAMPENER;
        signals.trend_strength *= NEAR_CLOSE_DAMPENER;
    }

    signals
}

/// Applies the minimum reward:risk skew. Returns the stop and whether it moved.
pub fn reconcile_stop(stop: f64, target: f64) -> (f64, bool) {
    if stop < target {
        return (stop, false);
    }
    let mut stop = target / RECONCILE_DIVISOR;
    if stop > target * MAX_STOP_TO_TARGET {
        stop = target * MAX_STOP_TO_TARGET;
    }
    (stop, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAggregate {
    /// Weighted favorable move of winning trades, in price units.
    pub suggested_target: Option<f64>,
    /// Weighted adverse move of losing trades, in price units.
    pub suggested_stop_loss: Option<f64>,
    pub stop_reconciled: bool,
    pub winners: usize,
    pub losers: usize,
    pub recent_winners: usize,
    pub recent_losers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Target,
    Stop,
}

pub struct MoveAggregator {
    pub recent_window: Duration,
    pub recent_weight: f64,
    clock: MarketClock,
}

impl MoveAggregator {
    pub fn new(cfg: &Config) -> Self {
        Self {
            recent_window: Duration::days(cfg.experience_lookback_days),
            recent_weight: cfg.recent_weight,
            clock: MarketClock::new(cfg),
        }
    }

    pub fn aggregate(&self, trades: &[Trade], as_of: DateTime<Utc>) -> MoveAggregate {
        let closed: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.is_closed())
            .filter(|t| {
                if t.entry_price > 0.0 {
                    true
                } else {
                    warn!("Skipping trade {} with entry price {}", t.label(), t.entry_price);
                    false
                }
            })
            .collect();

        let winners: Vec<&Trade> = closed.iter().copied().filter(|t| t.is_win()).collect();
        let losers: Vec<&Trade> = closed.iter().copied().filter(|t| t.is_loss()).collect();

        let (target, recent_winners) = self.weighted_average(&winners, as_of, Side::Target);
        let (stop, recent_losers) = self.weighted_average(&losers, as_of, Side::Stop);

        let (stop, stop_reconciled) = match (stop, target) {
            (Some(s), Some(t)) => {
                let (s, moved) = reconcile_stop(s, t);
                (Some(s), moved)
            }
            (s, _) => (s, false),
        };

        debug!(
            "Move aggregate: winners={} (recent {}) losers={} (recent {}) target={:?} stop={:?} reconciled={}",
            winners.len(),
            recent_winners,
            losers.len(),
            recent_losers,
            target,
            stop,
            stop_reconciled
        );

        MoveAggregate {
            suggested_target: target,
            suggested_stop_loss: stop,
            stop_reconciled,
            winners: winners.len(),
            losers: losers.len(),
            recent_winners,
            recent_losers,
        }
    }

    fn is_recent(&self, trade: &Trade, as_of: DateTime<Utc>) -> bool {
        trade
            .closed_exit()
            .is_some_and(|(exit, _)| as_of - exit <= self.recent_window)
    }

    /// Weighted mean of per-trade moves; recent trades count `recent_weight` times.
    fn weighted_average(
        &self,
        trades: &[&Trade],
        as_of: DateTime<Utc>,
        side: Side,
    ) -> (Option<f64>, usize) {
        if trades.is_empty() {
            return (None, 0);
        }

        let mut sum = 0.0;
        let mut weight_total = 0.0;
        let mut recent = 0;
        for t in trades {
            let weight = if self.is_recent(t, as_of) {
                recent += 1;
                self.recent_weight
            } else {
                1.0
            };
            let mv = match side {
                Side::Target => self.favorable_move(t),
                Side::Stop => self.adverse_move(t),
            };
            sum += mv * weight;
            weight_total += weight;
        }

        (Some(sum / weight_total), recent)
    }

    fn favorable_move(&self, trade: &Trade) -> f64 {
        let Some((_, exit_price)) = trade.closed_exit() else {
            return 0.0;
        };
        let base_move = (exit_price - trade.entry_price).abs();
        let Some((high, low)) = trade.post_exit_range() else {
            return base_move;
        };

        let mut weighted = base_move * trade_signals(trade, &self.clock).combined();

        let potential = match trade.direction {
            Direction::Long => high - trade.entry_price,
            Direction::Short => trade.entry_price - low,
        };
        if potential > base_move * POTENTIAL_BLEND_THRESHOLD {
            weighted = weighted * REALIZED_BLEND_WEIGHT + potential * POTENTIAL_BLEND_WEIGHT;
        }

        let momentum = (high - low).abs() / trade.entry_price;
        if momentum > STRONG_MOMENTUM {
            weighted *= TARGET_MOMENTUM_BOOST;
        } else if momentum < WEAK_MOMENTUM {
            weighted *= TARGET_MOMENTUM_CUT;
        }

        weighted
    }

    fn adverse_move(&self, trade: &Trade) -> f64 {
        let Some((_, exit_price)) = trade.closed_exit() else {
            return 0.0;
        };
        let actual_loss = (exit_price - trade.entry_price).abs();
        let Some((high, low)) = trade.post_exit_range() else {
            return actual_loss;
        };

        let mut weighted = actual_loss * trade_signals(trade, &self.clock).combined();

        let (adverse, recovery) = match trade.direction {
            Direction::Long => (trade.entry_price - low, high - exit_price),
            Direction::Short => (high - trade.entry_price, exit_price - low),
        };
        if adverse > actual_loss * POTENTIAL_BLEND_THRESHOLD {
            weighted = weighted * REALIZED_BLEND_WEIGHT + adverse * POTENTIAL_BLEND_WEIGHT;
        }
        if recovery > actual_loss * RECOVERY_THRESHOLD {
            weighted *= RECOVERY_DAMPENER;
        }

        let momentum = (high - low).abs() / trade.entry_price;
        if momentum > STRONG_MOMENTUM {
            weighted *= STOP_MOMENTUM_BOOST;
        } else if momentum < WEAK_MOMENTUM {
            weighted *= STOP_MOMENTUM_CUT;
        }

        weighted
    }
}
