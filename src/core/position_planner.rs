use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Entry price must be a positive number, got {0}")]
    InvalidEntry(f64),

    #[error("Account balance must be a non-negative number, got {0}")]
    InvalidBalance(f64),

    #[error("{name} level must be a positive number, got {value}")]
    InvalidLevel { name: &'static str, value: f64 },

    #[error("Stop price {stop:.2} equals entry {entry:.2}; risk per share would be zero")]
    ZeroRisk { entry: f64, stop: f64 },
}

/// Optional support/resistance levels entered next to the entry price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanLevels {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub use_support_resistance: bool,
}

impl PlanLevels {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn support_resistance(support: f64, resistance: f64) -> Self {
        Self {
            support: Some(support),
            resistance: Some(resistance),
            use_support_resistance: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPlan {
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub shares: u64,
    pub risk_per_share: f64,
    pub max_position_value: f64,
    pub risk_amount: f64,
    pub reward_amount: f64,
    pub reward_risk_ratio: f64,
    pub used_levels: bool,
}

pub struct PositionPlanner {
    pub default_stop_pct: f64,
    pub reward_risk_ratio: f64,
    pub level_buffer_pct: f64,
    pub max_position_pct: f64,
}

impl PositionPlanner {
    pub fn new(cfg: &Config) -> Self {
        Self {
            default_stop_pct: cfg.default_stop_pct,
            reward_risk_ratio: cfg.reward_risk_ratio,
            level_buffer_pct: cfg.level_buffer_pct,
            max_position_pct: cfg.max_position_pct,
        }
    }

    pub fn plan(
        &self,
        entry: f64,
        levels: &PlanLevels,
        account_balance: f64,
    ) -> Result<PositionPlan, PlanError> {
        if !entry.is_finite() || entry <= 0.0 {
            return Err(PlanError::InvalidEntry(entry));
        }
        if !account_balance.is_finite() || account_balance < 0.0 {
            return Err(PlanError::InvalidBalance(account_balance));
        }

        let level_pair = match (levels.use_support_resistance, levels.support, levels.resistance) {
            (true, Some(support), Some(resistance)) => {
                check_level("Support", support)?;
                check_level("Resistance", resistance)?;
                Some((support, resistance))
            }
            _ => None,
        };

        let buffer = 1.0 - self.level_buffer_pct;
        let (stop_price, target_price) = match level_pair {
            Some((support, resistance)) => (support * buffer, resistance * buffer),
            None => {
                let stop = entry * (1.0 - self.default_stop_pct);
                (stop, entry + (entry - stop) * self.reward_risk_ratio)
            }
        };

        let risk_per_share = (entry - stop_price).abs();
        if risk_per_share <= f64::EPSILON * entry {
            return Err(PlanError::ZeroRisk {
                entry,
                stop: stop_price,
            });
        }

        let max_position_value = account_balance * self.max_position_pct;
        // Relative nudge absorbs float error in exact quotients only.
        let shares = (max_position_value / entry * (1.0 + 1e-12)).floor() as u64;
        let reward_per_share = (target_price - entry).abs();

        let plan = PositionPlan {
            entry_price: round2(entry),
            stop_price: round2(stop_price),
            target_price: round2(target_price),
            shares,
            risk_per_share: round2(risk_per_share),
            max_position_value: round2(max_position_value),
            risk_amount: round2(shares as f64 * risk_per_share),
            reward_amount: round2(shares as f64 * reward_per_share),
            reward_risk_ratio: round2(reward_per_share / risk_per_share),
            used_levels: level_pair.is_some(),
        };
        debug!(
            "Plan: entry={:.2} stop={:.2} target={:.2} shares={} risk={:.2} reward={:.2}",
            plan.entry_price,
            plan.stop_price,
            plan.target_price,
            plan.shares,
            plan.risk_amount,
            plan.reward_amount
        );
        Ok(plan)
    }
}

fn check_level(name: &'static str, value: f64) -> Result<(), PlanError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlanError::InvalidLevel { name, value })
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
