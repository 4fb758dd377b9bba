use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::Config;
use crate::core::experience::{ExperienceClassifier, ExperienceProfile};
use crate::core::moves::{MoveAggregate, MoveAggregator, MAX_STOP_TO_TARGET};
use crate::core::timing::{HoldWindow, TimingAnalysis, TimingAnalyzer};
use crate::models::{ExperiencePreference, Trade};

pub const INSUFFICIENT_DATA: &str = "Insufficient data";

/// Stop, target and hold time suggested for the next trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggested_stop_loss: Option<f64>,
    pub suggested_target: Option<f64>,
    pub suggested_hold_time: Option<String>,
    pub hold_time_context: String,
    pub experience_level: String,
    pub experience_context: String,
    pub trades_analyzed: usize,
}

impl Suggestion {
    pub fn stop_loss_display(&self) -> String {
        money_or_placeholder(self.suggested_stop_loss)
    }

    pub fn target_display(&self) -> String {
        money_or_placeholder(self.suggested_target)
    }

    pub fn hold_time_display(&self) -> &str {
        self.suggested_hold_time.as_deref().unwrap_or(INSUFFICIENT_DATA)
    }
}

fn money_or_placeholder(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("${:.2}", v),
        None => INSUFFICIENT_DATA.to_string(),
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Experience:  {}", self.experience_level)?;
        writeln!(f, "             {}", self.experience_context)?;
        writeln!(f, "Stop loss:   {}", self.stop_loss_display())?;
        writeln!(f, "Target:      {}", self.target_display())?;
        writeln!(f, "Hold time:   {}", self.hold_time_display())?;
        writeln!(f, "             {}", self.hold_time_context)?;
        write!(f, "Trades analyzed: {}", self.trades_analyzed)
    }
}

/// Everything the suggestion was derived from, for callers that want more than the strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionBreakdown {
    pub suggestion: Suggestion,
    pub experience: ExperienceProfile,
    pub moves: MoveAggregate,
    pub timing: TimingAnalysis,
}

pub struct SuggestionEngine {
    classifier: ExperienceClassifier,
    aggregator: MoveAggregator,
    timing: TimingAnalyzer,
}

impl SuggestionEngine {
    pub fn new(cfg: &Config) -> Self {
        Self {
            classifier: ExperienceClassifier::new(cfg),
            aggregator: MoveAggregator::new(cfg),
            timing: TimingAnalyzer::new(cfg),
        }
    }

    pub fn suggest(
        &self,
        trades: &[Trade],
        preference: ExperiencePreference,
        as_of: DateTime<Utc>,
    ) -> Suggestion {
        self.suggest_detailed(trades, preference, as_of).suggestion
    }

    pub fn suggest_detailed(
        &self,
        trades: &[Trade],
        preference: ExperiencePreference,
        as_of: DateTime<Utc>,
    ) -> SuggestionBreakdown {
        let experience = self.classifier.classify(trades, preference, as_of);
        let moves = self.aggregator.aggregate(trades, as_of);
        let timing = self.timing.analyze(trades);
        let m = experience.multipliers;

        let target = moves
            .suggested_target
            .map(|t| round2(t * timing.target_multiplier * m.target));
        let mut stop = moves.suggested_stop_loss.map(|s| round2(s * m.stop_loss));

        // Experience scaling and cent rounding can undo the aggregator's skew;
        // enforce it on the values that are reported.
        if let (Some(s), Some(t)) = (stop, target) {
            if moves.stop_reconciled || s >= t {
                stop = Some(
                    s.min(floor_cents(t / 1.5))
                        .min(floor_cents(t * MAX_STOP_TO_TARGET)),
                );
            }
        }

        let hold = timing.hold_window.map(|w| scale_hold(w, m.hold_time));
        let trades_analyzed = trades.iter().filter(|t| t.is_closed()).count();

        debug!(
            "Suggestion: tier={} target={:?} stop={:?} hold={:?} n={}",
            experience.tier, target, stop, hold, trades_analyzed
        );

        let suggestion = Suggestion {
            suggested_stop_loss: stop,
            suggested_target: target,
            suggested_hold_time: hold.map(|w| format!("{} minutes", w)),
            hold_time_context: timing.hold_time_context.clone(),
            experience_level: experience.display_level.clone(),
            experience_context: experience.explanation.clone(),
            trades_analyzed,
        };

        SuggestionBreakdown {
            suggestion,
            experience,
            moves,
            timing,
        }
    }
}

fn scale_hold(window: HoldWindow, factor: f64) -> HoldWindow {
    window.scaled(factor, 1)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Largest whole-cent value not above `x`.
fn floor_cents(x: f64) -> f64 {
    let cents = (x * 100.0).floor() / 100.0;
    if cents > x {
        round2(cents - 0.01)
    } else {
        cents
    }
}
