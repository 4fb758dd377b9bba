use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::models::{ExperiencePreference, ExperienceTier, Multipliers, Trade};

const ADVANCED_MIN_WIN_RATE: f64 = 0.60;
const INTERMEDIATE_MIN_WIN_RATE: f64 = 0.45;
/// Max P&L variance for the advanced tier.
const ADVANCED_MAX_VARIANCE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceProfile {
    pub tier: ExperienceTier,
    pub multipliers: Multipliers,
    pub display_level: String,
    pub explanation: String,
    pub auto_mode: bool,
    pub trades_considered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentPerformance {
    pub total: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub avg_profit: f64,
    /// Population variance of realized P&L; lower is more consistent.
    pub consistency_score: f64,
}

impl RecentPerformance {
    pub fn from_trades(trades: &[&Trade]) -> Self {
        let total = trades.len();
        if total == 0 {
            return Self {
                total: 0,
                wins: 0,
                win_rate: 0.0,
                avg_profit: 0.0,
                consistency_score: 0.0,
            };
        }
        let n = total as f64;
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let avg_profit = trades.iter().map(|t| t.realized()).sum::<f64>() / n;
        let consistency_score = trades
            .iter()
            .map(|t| (t.realized() - avg_profit).powi(2))
            .sum::<f64>()
            / n;

        Self {
            total,
            wins,
            win_rate: wins as f64 / n,
            avg_profit,
            consistency_score,
        }
    }

    pub fn tier(&self) -> ExperienceTier {
        if self.win_rate >= ADVANCED_MIN_WIN_RATE
            && self.avg_profit > 0.0
            && self.consistency_score < ADVANCED_MAX_VARIANCE
        {
            ExperienceTier::Advanced
        } else if self.win_rate >= INTERMEDIATE_MIN_WIN_RATE && self.avg_profit > 0.0 {
            ExperienceTier::Intermediate
        } else {
            ExperienceTier::Beginner
        }
    }
}

pub struct ExperienceClassifier {
    pub lookback_days: i64,
    pub min_trades: usize,
}

impl ExperienceClassifier {
    pub fn new(cfg: &Config) -> Self {
        Self {
            lookback_days: cfg.experience_lookback_days,
            min_trades: cfg.min_trades_for_auto,
        }
    }

    pub fn classify(
        &self,
        trades: &[Trade],
        preference: ExperiencePreference,
        as_of: DateTime<Utc>,
    ) -> ExperienceProfile {
        match preference {
            ExperiencePreference::Fixed(tier) => ExperienceProfile {
                tier,
                multipliers: tier.multipliers(),
                display_level: tier.label().to_string(),
                explanation: format!("{} settings: {}.", tier.label(), tier.description()),
                auto_mode: false,
                trades_considered: 0,
            },
            ExperiencePreference::Auto => self.classify_auto(trades, as_of),
        }
    }

    fn classify_auto(&self, trades: &[Trade], as_of: DateTime<Utc>) -> ExperienceProfile {
        let cutoff = Duration::days(self.lookback_days);
        let recent: Vec<&Trade> = trades
            .iter()
            .filter(|t| match t.closed_exit() {
                Some((exit, _)) => as_of - exit <= cutoff,
                None => false,
            })
            .collect();

        if recent.len() < self.min_trades {
            debug!(
                "Auto experience: {} closed trades in {}d, need {}",
                recent.len(),
                self.lookback_days,
                self.min_trades
            );
            let tier = ExperienceTier::Beginner;
            return ExperienceProfile {
                tier,
                multipliers: tier.multipliers(),
                display_level: "Auto Mode".to_string(),
                explanation: format!(
                    "Need {} closed trades from the last {} days to assess your level (you have {}). Using beginner settings until then.",
                    self.min_trades,
                    self.lookback_days,
                    recent.len()
                ),
                auto_mode: true,
                trades_considered: recent.len(),
            };
        }

        let perf = RecentPerformance::from_trades(&recent);
        let tier = perf.tier();
        debug!(
            "Auto experience: n={} wr={:.3} avg={:.2} var={:.2} -> {}",
            perf.total, perf.win_rate, perf.avg_profit, perf.consistency_score, tier
        );

        ExperienceProfile {
            tier,
            multipliers: tier.multipliers(),
            display_level: format!("Auto Mode ({})", tier.label()),
            explanation: format!(
                "Based on {} trades in the last {} days with a {:.1}% win rate: {}.",
                perf.total,
                self.lookback_days,
                perf.win_rate * 100.0,
                tier.description()
            ),
            auto_mode: true,
            trades_considered: perf.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{as_of, default_test_config, recent_trades};

    fn classifier() -> ExperienceClassifier {
        ExperienceClassifier::new(&default_test_config())
    }

    #[test]
    fn explicit_level_maps_to_table() {
        let p = classifier().classify(
            &[],
            ExperiencePreference::Fixed(ExperienceTier::Advanced),
            as_of(),
        );
        assert_eq!(p.tier, ExperienceTier::Advanced);
        assert_eq!(p.display_level, "Advanced");
        assert!(!p.auto_mode);
        assert_eq!(p.multipliers, ExperienceTier::Advanced.multipliers());
    }

    #[test]
    fn auto_falls_back_with_few_trades() {
        let trades = recent_trades(&[10.0; 9]);
        let p = classifier().classify(&trades, ExperiencePreference::Auto, as_of());
        assert_eq!(p.display_level, "Auto Mode");
        assert_eq!(p.tier, ExperienceTier::Beginner);
        assert_eq!(p.multipliers.stop_loss, 1.2);
        assert_eq!(p.multipliers.target, 0.8);
        assert_eq!(p.multipliers.hold_time, 0.8);
        assert!(p.explanation.contains("Need 10"));
        assert!(p.explanation.contains("you have 9"));
    }

    #[test]
    fn old_trades_do_not_count() {
        let mut trades = recent_trades(&[10.0; 12]);
        for t in trades.iter_mut().take(5) {
            let exit = as_of() - Duration::days(120);
            t.exit_date = Some(exit);
        }
        let p = classifier().classify(&trades, ExperiencePreference::Auto, as_of());
        assert_eq!(p.display_level, "Auto Mode");
        assert_eq!(p.trades_considered, 7);
    }

    #[test]
    fn auto_advanced() {
        // 7 x +10, 3 x -5: wr 0.7, mean 5.5, variance 47.25
        let mut pnls = vec![10.0; 7];
        pnls.extend(vec![-5.0; 3]);
        let p = classifier().classify(&recent_trades(&pnls), ExperiencePreference::Auto, as_of());
        assert_eq!(p.tier, ExperienceTier::Advanced);
        assert_eq!(p.display_level, "Auto Mode (Advanced)");
        assert!(p.explanation.contains("10 trades"));
        assert!(p.explanation.contains("70.0%"));
    }

    #[test]
    fn auto_intermediate_when_inconsistent() {
        let mut pnls = vec![50.0; 6];
        pnls.extend(vec![-20.0; 4]);
        let p = classifier().classify(&recent_trades(&pnls), ExperiencePreference::Auto, as_of());
        assert_eq!(p.tier, ExperienceTier::Intermediate);
        assert_eq!(p.display_level, "Auto Mode (Intermediate)");
    }

    #[test]
    fn auto_beginner_when_losing() {
        let mut pnls = vec![5.0; 3];
        pnls.extend(vec![-5.0; 7]);
        let p = classifier().classify(&recent_trades(&pnls), ExperiencePreference::Auto, as_of());
        assert_eq!(p.tier, ExperienceTier::Beginner);
        assert_eq!(p.display_level, "Auto Mode (Beginner)");
    }
}
