use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::Config;
use crate::core::market_hours::MarketClock;
use crate::models::{Direction, Trade};

const QUICK_MAX_MIN: f64 = 5.0;
const MODERATE_MAX_MIN: f64 = 15.0;
const SLOW_MAX_MIN: f64 = 30.0;

/// Exits at or before 10:00 count as morning, at or after 15:30 as end of day.
const MORNING_CUTOFF_HOUR: f64 = 10.0;
const END_OF_DAY_HOUR: f64 = 15.5;

const MORNING_HEAVY_RATE: f64 = 0.5;
const MORNING_SCALE: f64 = 0.8;
const END_OF_DAY_HEAVY_RATE: f64 = 0.4;
const END_OF_DAY_SCALE: f64 = 0.7;
const MIN_HOLD_MINUTES: u32 = 3;

/// Post-exit continuation beyond this fraction of entry counts as follow-through.
const FOLLOW_THROUGH_PCT: f64 = 0.01;
const MAX_MISSED_EXAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldWindow {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl HoldWindow {
    pub fn new(min_minutes: u32, max_minutes: u32) -> Self {
        Self {
            min_minutes,
            max_minutes: max_minutes.max(min_minutes),
        }
    }

    /// Scales both bounds, rounding to whole minutes, never below `floor`.
    pub fn scaled(self, factor: f64, floor: u32) -> Self {
        let scale = |m: u32| ((m as f64 * factor).round() as u32).max(floor);
        Self::new(scale(self.min_minutes), scale(self.max_minutes))
    }
}

impl fmt::Display for HoldWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_minutes, self.max_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub sample_size: usize,
    pub avg_time_to_optimal: f64,
    pub quick_move_rate: f64,
    pub moderate_move_rate: f64,
    pub slow_move_rate: f64,
    pub morning_rate: f64,
    pub end_of_day_rate: f64,
    pub favorable_timing_rate: f64,
    pub follow_through_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedOpportunity {
    pub label: String,
    pub exit_price: f64,
    pub optimal_price: f64,
    pub missed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingAnalysis {
    pub hold_window: Option<HoldWindow>,
    pub hold_time_context: String,
    /// Applied to the aggregated target before experience scaling.
    pub target_multiplier: f64,
    pub stats: Option<TimingStats>,
    pub missed_opportunities: Vec<MissedOpportunity>,
}

/// Per-trade facts the rates are built from.
struct TimingSample {
    time_to_optimal: f64,
    morning: bool,
    end_of_day: bool,
    favorable_timing: bool,
    follow_through: bool,
}

pub struct TimingAnalyzer {
    clock: MarketClock,
}

impl TimingAnalyzer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            clock: MarketClock::new(cfg),
        }
    }

    pub fn analyze(&self, trades: &[Trade]) -> TimingAnalysis {
        let timed: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.is_closed() && t.post_exit_times().is_some())
            .collect();

        if timed.is_empty() {
            return TimingAnalysis {
                hold_window: None,
                hold_time_context:
                    "Not enough trades with post-exit timing data to suggest a hold time."
                        .to_string(),
                target_multiplier: 1.0,
                stats: None,
                missed_opportunities: Vec::new(),
            };
        }

        let samples: Vec<TimingSample> = timed.iter().filter_map(|t| self.sample(t)).collect();
        let stats = summarize(&samples);
        debug!(
            "Timing: n={} avg={:.1}m quick={:.2} morning={:.2} eod={:.2} favorable={:.2} follow={:.2}",
            stats.sample_size,
            stats.avg_time_to_optimal,
            stats.quick_move_rate,
            stats.morning_rate,
            stats.end_of_day_rate,
            stats.favorable_timing_rate,
            stats.follow_through_rate
        );

        let mut window = base_window(&stats);
        let mut context = format!(
            "Based on {} trades with post-exit timing, price reached its best level {:.1} minutes after exit on average ({:.0}% within {} minutes).",
            stats.sample_size,
            stats.avg_time_to_optimal,
            stats.quick_move_rate * 100.0,
            QUICK_MAX_MIN
        );

        if stats.morning_rate > MORNING_HEAVY_RATE {
            window = window.scaled(MORNING_SCALE, MIN_HOLD_MINUTES);
            context.push_str(&format!(
                " {:.0}% of your exits happen by 10:00, when moves develop faster, so the window is shortened.",
                stats.morning_rate * 100.0
            ));
        }
        if stats.end_of_day_rate > END_OF_DAY_HEAVY_RATE {
            window = window.scaled(END_OF_DAY_SCALE, MIN_HOLD_MINUTES);
            context.push_str(&format!(
                " {:.0}% of your exits come after 15:30, so the window is shortened ahead of the close.",
                stats.end_of_day_rate * 100.0
            ));
        }

        let missed = missed_opportunities(&timed);
        if !missed.is_empty() {
            let examples: Vec<String> = missed
                .iter()
                .map(|m| format!("{} (missed ${:.2})", m.label, m.missed))
                .collect();
            context.push_str(&format!(" Biggest missed moves: {}.", examples.join(", ")));
        }

        TimingAnalysis {
            hold_window: Some(window),
            hold_time_context: context,
            target_multiplier: target_multiplier(&stats),
            stats: Some(stats),
            missed_opportunities: missed,
        }
    }

    fn sample(&self, trade: &Trade) -> Option<TimingSample> {
        let (exit, _) = trade.closed_exit()?;
        let (time_of_high, time_of_low) = trade.post_exit_times()?;

        let optimal_at = match trade.direction {
            Direction::Long => time_of_high,
            Direction::Short => time_of_low,
        };
        let time_to_optimal = ((optimal_at - exit).num_seconds() as f64 / 60.0).max(0.0);

        let hour = self.clock.hour_of_day(exit);
        let low_first = trade.low_before_high().unwrap_or(false);
        let favorable_timing = match trade.direction {
            Direction::Long => low_first,
            Direction::Short => !low_first,
        };
        let follow_through = trade
            .missed_opportunity()
            .is_some_and(|m| trade.entry_price > 0.0 && m / trade.entry_price > FOLLOW_THROUGH_PCT);

        Some(TimingSample {
            time_to_optimal,
            morning: hour <= MORNING_CUTOFF_HOUR,
            end_of_day: hour >= END_OF_DAY_HOUR,
            favorable_timing,
            follow_through,
        })
    }
}

fn rate(samples: &[TimingSample], pred: impl Fn(&TimingSample) -> bool) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().filter(|&s| pred(s)).count() as f64 / samples.len() as f64
}

fn summarize(samples: &[TimingSample]) -> TimingStats {
    let avg_time_to_optimal = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|s| s.time_to_optimal).sum::<f64>() / samples.len() as f64
    };

    TimingStats {
        sample_size: samples.len(),
        avg_time_to_optimal,
        quick_move_rate: rate(samples, |s| s.time_to_optimal <= QUICK_MAX_MIN),
        moderate_move_rate: rate(samples, |s| {
            s.time_to_optimal > QUICK_MAX_MIN && s.time_to_optimal <= MODERATE_MAX_MIN
        }),
        slow_move_rate: rate(samples, |s| {
            s.time_to_optimal > MODERATE_MAX_MIN && s.time_to_optimal <= SLOW_MAX_MIN
        }),
        morning_rate: rate(samples, |s| s.morning),
        end_of_day_rate: rate(samples, |s| s.end_of_day),
        favorable_timing_rate: rate(samples, |s| s.favorable_timing),
        follow_through_rate: rate(samples, |s| s.follow_through),
    }
}

/// Hold-time tiers, fastest first.
fn base_window(stats: &TimingStats) -> HoldWindow {
    let favorable = stats.favorable_timing_rate >= 0.5;
    let (lo, hi) = if stats.quick_move_rate >= 0.6 {
        (3, 8)
    } else if stats.quick_move_rate >= 0.4 {
        if favorable {
            (5, 12)
        } else {
            (4, 10)
        }
    } else if stats.avg_time_to_optimal <= MODERATE_MAX_MIN {
        if favorable {
            (10, 25)
        } else {
            (8, 20)
        }
    } else if stats.avg_time_to_optimal <= SLOW_MAX_MIN {
        (15, 40)
    } else {
        (30, 60)
    };
    HoldWindow::new(lo, hi)
}

fn target_multiplier(stats: &TimingStats) -> f64 {
    let mut m = 1.0;
    if stats.quick_move_rate > 0.5 && stats.favorable_timing_rate > 0.6 {
        m *= 1.1;
    }
    if stats.favorable_timing_rate < 0.3 {
        m *= 0.85;
    }
    if stats.follow_through_rate > 0.5 {
        m *= 1.15;
    }
    if stats.end_of_day_rate > END_OF_DAY_HEAVY_RATE {
        m *= 0.9;
    }
    m
}

/// Up to three trades that left the most on the table, largest first.
fn missed_opportunities(trades: &[&Trade]) -> Vec<MissedOpportunity> {
    let mut out: Vec<MissedOpportunity> = trades
        .iter()
        .filter_map(|t| {
            let (_, exit_price) = t.closed_exit()?;
            let optimal_price = t.favorable_extreme()?;
            let missed = t.missed_opportunity()?;
            (missed > 0.0).then(|| MissedOpportunity {
                label: t.label(),
                exit_price,
                optimal_price,
                missed,
            })
        })
        .collect();
    out.sort_by(|a, b| b.missed.total_cmp(&a.missed));
    out.truncate(MAX_MISSED_EXAMPLES);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{closed_trade, default_test_config, ny, with_post_exit, with_post_exit_times};

    fn analyzer() -> TimingAnalyzer {
        TimingAnalyzer::new(&default_test_config())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn morning_quick_move_buckets() {
        let t = closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, 3, 9, 45));
        let t = with_post_exit_times(t, 5, 2);
        let a = analyzer().analyze(&[t]);
        let stats = a.stats.unwrap();
        assert_eq!(stats.sample_size, 1);
        assert!(approx(stats.quick_move_rate, 1.0));
        assert!(approx(stats.morning_rate, 1.0));
        assert!(approx(stats.end_of_day_rate, 0.0));
        // quick tier 3-8, morning x0.8 -> 3-6
        assert_eq!(a.hold_window, Some(HoldWindow::new(3, 6)));
        assert!(a.hold_time_context.contains("by 10:00"));
    }

    #[test]
    fn no_timed_trades() {
        let t = closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, 3, 12, 0));
        let a = analyzer().analyze(&[t]);
        assert!(a.hold_window.is_none());
        assert!(a.stats.is_none());
        assert!(approx(a.target_multiplier, 1.0));
    }

    #[test]
    fn slow_midday_moves_get_long_window() {
        let trades: Vec<Trade> = (0..4)
            .map(|i| {
                let t = closed_trade(Direction::Short, 50.0, 49.0, 100.0, ny(2024, 6, 3 + i, 12, 0));
                with_post_exit_times(t, 10, 45)
            })
            .collect();
        let a = analyzer().analyze(&trades);
        let stats = a.stats.unwrap();
        assert!(approx(stats.avg_time_to_optimal, 45.0));
        assert!(approx(stats.slow_move_rate, 0.0));
        assert_eq!(a.hold_window, Some(HoldWindow::new(30, 60)));
        // high came first for every short: favorable timing
        assert!(approx(stats.favorable_timing_rate, 1.0));
    }

    #[test]
    fn moderate_tier_depends_on_favorable_timing() {
        // long, high at 12m, low at 3m: low first -> favorable
        let fav: Vec<Trade> = (0..2)
            .map(|i| with_post_exit_times(
                closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, 3 + i, 12, 0)),
                12,
                3,
            ))
            .collect();
        assert_eq!(analyzer().analyze(&fav).hold_window, Some(HoldWindow::new(10, 25)));

        let unfav: Vec<Trade> = (0..2)
            .map(|i| with_post_exit_times(
                closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, 3 + i, 12, 0)),
                12,
                20,
            ))
            .collect();
        let a = analyzer().analyze(&unfav);
        assert_eq!(a.hold_window, Some(HoldWindow::new(8, 20)));
        // poor timing accuracy trims the target
        assert!(approx(a.target_multiplier, 0.85));
    }

    #[test]
    fn mixed_quick_tier_depends_on_favorable_timing() {
        // half the moves land within 5 minutes
        let midday = |day, to_high, to_low| {
            with_post_exit_times(
                closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, day, 12, 0)),
                to_high,
                to_low,
            )
        };

        // low first on both: favorable
        let fav = vec![midday(3, 3, 1), midday(4, 20, 2)];
        let a = analyzer().analyze(&fav);
        assert!(approx(a.stats.unwrap().quick_move_rate, 0.5));
        assert_eq!(a.hold_window, Some(HoldWindow::new(5, 12)));

        // high first on both: unfavorable
        let unfav = vec![midday(3, 3, 10), midday(4, 20, 25)];
        let a = analyzer().analyze(&unfav);
        assert!(approx(a.stats.unwrap().favorable_timing_rate, 0.0));
        assert_eq!(a.hold_window, Some(HoldWindow::new(4, 10)));
    }

    #[test]
    fn end_of_day_shortens_window_and_target() {
        let trades: Vec<Trade> = (0..3)
            .map(|i| with_post_exit_times(
                closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, 3 + i, 15, 45)),
                20,
                2,
            ))
            .collect();
        let a = analyzer().analyze(&trades);
        // avg 20 -> 15-40, x0.7 -> 11-28
        assert_eq!(a.hold_window, Some(HoldWindow::new(11, 28)));
        assert!(approx(a.target_multiplier, 0.9));
        assert!(a.hold_time_context.contains("after 15:30"));
    }

    #[test]
    fn quick_accurate_follow_through_boosts_target() {
        let trades: Vec<Trade> = (0..3)
            .map(|i| {
                let t = closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, 3 + i, 12, 0));
                with_post_exit_times(with_post_exit(t, 104.0, 100.5), 4, 1)
            })
            .collect();
        let a = analyzer().analyze(&trades);
        assert!(approx(a.target_multiplier, 1.1 * 1.15));
    }

    #[test]
    fn names_top_three_missed_moves() {
        let trades: Vec<Trade> = [1.0, 4.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, &extra)| {
                let mut t = closed_trade(Direction::Long, 100.0, 101.0, 100.0, ny(2024, 6, 3 + i as u32, 12, 0));
                t.symbol = Some(format!("SYM{i}"));
                with_post_exit_times(with_post_exit(t, 101.0 + extra, 100.0), 10, 3)
            })
            .collect();
        let a = analyzer().analyze(&trades);
        let missed: Vec<f64> = a.missed_opportunities.iter().map(|m| m.missed).collect();
        assert_eq!(missed, vec![4.0, 3.0, 2.0]);
        assert!(a.hold_time_context.contains("SYM1 LONG"));
        assert!(!a.hold_time_context.contains("SYM0"));
    }
}
