use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::core::market_hours::MarketClock;
use crate::models::Trade;

const DIMENSIONS: &[&str] = &["direction", "day_of_week", "session", "direction_session"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub dimension: String,
    pub value: String,
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub payoff_ratio: f64,
    pub profit_factor: f64,
    pub edge: f64,
    pub sample_sufficient: bool,
}

pub type DimensionStats = BTreeMap<String, BucketStats>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalAnalysis {
    pub overall: BucketStats,
    pub dimensions: BTreeMap<String, DimensionStats>,
}

pub struct TradeAnalyzer {
    pub min_sample: usize,
    clock: MarketClock,
}

impl TradeAnalyzer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            min_sample: cfg.min_sample_per_bucket,
            clock: MarketClock::new(cfg),
        }
    }

    pub fn analyze(&self, trades: &[Trade]) -> JournalAnalysis {
        let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();

        let mut dimensions = BTreeMap::new();
        for &dim in DIMENSIONS {
            dimensions.insert(dim.to_string(), self.analyze_dimension(&closed, dim));
        }

        JournalAnalysis {
            overall: self.compute_stats("overall", "all", &closed),
            dimensions,
        }
    }

    pub fn get_negative_edge_buckets(&self, analysis: &JournalAnalysis) -> Vec<BucketStats> {
        let mut out: Vec<BucketStats> = analysis
            .dimensions
            .values()
            .flat_map(|dim_stats| dim_stats.values())
            .filter(|b| b.sample_sufficient && b.edge < 0.0)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.edge.total_cmp(&b.edge));
        out
    }

    pub fn get_strongest_buckets(&self, analysis: &JournalAnalysis) -> Vec<BucketStats> {
        let mut out: Vec<BucketStats> = analysis
            .dimensions
            .values()
            .flat_map(|dim_stats| dim_stats.values())
            .filter(|b| b.sample_sufficient && b.edge > 0.0)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.edge.total_cmp(&a.edge));
        out
    }

    fn analyze_dimension(&self, trades: &[&Trade], dimension: &str) -> DimensionStats {
        let mut buckets: BTreeMap<String, Vec<&Trade>> = BTreeMap::new();

        for t in trades {
            if let Some(key) = self.extract_key(t, dimension) {
                buckets.entry(key).or_default().push(*t);
            }
        }

        buckets
            .into_iter()
            .map(|(value, trades)| {
                let stats = self.compute_stats(dimension, &value, &trades);
                (value, stats)
            })
            .collect()
    }

    fn extract_key(&self, trade: &Trade, dimension: &str) -> Option<String> {
        let (exit, _) = trade.closed_exit()?;
        match dimension {
            "direction" => Some(trade.direction.as_str().to_string()),
            "day_of_week" => Some(self.clock.day_of_week(exit)),
            "session" => Some(self.clock.session(exit).to_string()),
            "direction_session" => Some(format!(
                "{}_{}",
                trade.direction.as_str(),
                self.clock.session(exit)
            )),
            _ => None,
        }
    }

    fn compute_stats(&self, dimension: &str, value: &str, trades: &[&Trade]) -> BucketStats {
        let total = trades.len();
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let losses = trades.iter().filter(|t| t.is_loss()).count();
        let win_rate = if total > 0 {
            wins as f64 / total as f64
        } else {
            0.0
        };
        let loss_rate = if total > 0 {
            losses as f64 / total as f64
        } else {
            0.0
        };

        let total_pnl: f64 = trades.iter().map(|t| t.realized()).sum();
        let avg_pnl = if total > 0 {
            total_pnl / total as f64
        } else {
            0.0
        };

        let gross_win: f64 = trades
            .iter()
            .filter(|t| t.is_win())
            .map(|t| t.realized())
            .sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.is_loss())
            .map(|t| t.realized())
            .sum::<f64>()
            .abs();

        let avg_win = if wins > 0 { gross_win / wins as f64 } else { 0.0 };
        let avg_loss = if losses > 0 {
            gross_loss / losses as f64
        } else {
            0.0
        };

        let payoff_ratio = if avg_loss > 0.0 {
            avg_win / avg_loss
        } else {
            0.0
        };
        let profit_factor = if gross_loss > 0.0 {
            gross_win / gross_loss
        } else {
            0.0
        };

        let edge = (win_rate * avg_win) - (loss_rate * avg_loss);

        BucketStats {
            dimension: dimension.to_string(),
            value: value.to_string(),
            total,
            wins,
            losses,
            win_rate: round4(win_rate),
            avg_pnl: round4(avg_pnl),
            total_pnl: round4(total_pnl),
            avg_win: round4(avg_win),
            avg_loss: round4(avg_loss),
            payoff_ratio: round4(payoff_ratio),
            profit_factor: round4(profit_factor),
            edge: round4(edge),
            sample_sufficient: total >= self.min_sample,
        }
    }
}

fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}
