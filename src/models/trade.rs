use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Direction, ExperiencePreference, TradeStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    #[serde(default)]
    pub realized: f64,
}

/// When the post-exit extremes printed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostExitAnalysis {
    #[serde(default)]
    pub time_of_high: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_of_low: Option<DateTime<Utc>>,
    #[serde(default)]
    pub low_before_high: Option<bool>,
}

/// A journal entry as exported by the journal API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    pub entry_date: DateTime<Utc>,
    #[serde(default)]
    pub exit_date: Option<DateTime<Utc>>,
    pub entry_price: f64,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub status: TradeStatus,
    #[serde(default)]
    pub profit_loss: ProfitLoss,
    #[serde(default)]
    pub post_exit_high: Option<f64>,
    #[serde(default)]
    pub post_exit_low: Option<f64>,
    #[serde(default)]
    pub post_exit_analysis: Option<PostExitAnalysis>,
}

impl Trade {
    /// Closed with both exit date and exit price recorded.
    pub fn is_closed(&self) -> bool {
        self.closed_exit().is_some()
    }

    pub fn closed_exit(&self) -> Option<(DateTime<Utc>, f64)> {
        if self.status != TradeStatus::Closed {
            return None;
        }
        Some((self.exit_date?, self.exit_price?))
    }

    pub fn realized(&self) -> f64 {
        self.profit_loss.realized
    }

    pub fn is_win(&self) -> bool {
        self.realized() > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.realized() < 0.0
    }

    /// `(high, low)` observed after exit, when both were recorded.
    pub fn post_exit_range(&self) -> Option<(f64, f64)> {
        Some((self.post_exit_high?, self.post_exit_low?))
    }

    /// `(time_of_high, time_of_low)`, when both were recorded.
    pub fn post_exit_times(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let analysis = self.post_exit_analysis.as_ref()?;
        Some((analysis.time_of_high?, analysis.time_of_low?))
    }

    /// Whether the post-exit low printed before the post-exit high.
    pub fn low_before_high(&self) -> Option<bool> {
        let analysis = self.post_exit_analysis.as_ref()?;
        if let Some(flag) = analysis.low_before_high {
            return Some(flag);
        }
        Some(analysis.time_of_low? < analysis.time_of_high?)
    }

    /// Best price available after exit in the trade's direction.
    pub fn favorable_extreme(&self) -> Option<f64> {
        match self.direction {
            Direction::Long => self.post_exit_high,
            Direction::Short => self.post_exit_low,
        }
    }

    /// Per-unit price left on the table after exit, zero when price never
    /// moved further in the trade's favour.
    pub fn missed_opportunity(&self) -> Option<f64> {
        let (_, exit_price) = self.closed_exit()?;
        let optimal = self.favorable_extreme()?;
        let missed = match self.direction {
            Direction::Long => optimal - exit_price,
            Direction::Short => exit_price - optimal,
        };
        Some(missed.max(0.0))
    }

    /// Human label for narratives: symbol, falling back to id, then entry date.
    pub fn label(&self) -> String {
        match (&self.symbol, &self.id) {
            (Some(symbol), _) => format!(
                "{} {} {}",
                symbol,
                self.direction,
                self.entry_date.format("%Y-%m-%d")
            ),
            (None, Some(id)) => format!("#{} {}", id, self.direction),
            (None, None) => format!(
                "{} {}",
                self.direction,
                self.entry_date.format("%Y-%m-%d %H:%M")
            ),
        }
    }
}

/// Account metadata from the trader's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    #[serde(default)]
    pub starting_capital: f64,
    #[serde(default)]
    pub total_profit: f64,
    #[serde(default)]
    pub experience_level: Option<ExperiencePreference>,
}

impl AccountProfile {
    pub fn balance(&self) -> f64 {
        self.starting_capital + self.total_profit
    }
}
