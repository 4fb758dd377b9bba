use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceTier {
    Beginner,
    Intermediate,
    Advanced,
}

/// Scaling applied to suggested stops, targets and hold times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    pub stop_loss: f64,
    pub target: f64,
    pub hold_time: f64,
}

/// One row per tier, indexed by `ExperienceTier::index`.
const TIER_MULTIPLIERS: [Multipliers; 3] = [
    Multipliers {
        stop_loss: 1.2,
        target: 0.8,
        hold_time: 0.8,
    },
    Multipliers {
        stop_loss: 1.0,
        target: 1.0,
        hold_time: 1.0,
    },
    Multipliers {
        stop_loss: 0.8,
        target: 1.2,
        hold_time: 1.2,
    },
];

impl ExperienceTier {
    pub const ALL: [ExperienceTier; 3] = [
        ExperienceTier::Beginner,
        ExperienceTier::Intermediate,
        ExperienceTier::Advanced,
    ];

    fn index(self) -> usize {
        match self {
            ExperienceTier::Beginner => 0,
            ExperienceTier::Intermediate => 1,
            ExperienceTier::Advanced => 2,
        }
    }

    pub fn multipliers(self) -> Multipliers {
        TIER_MULTIPLIERS[self.index()]
    }

    /// Capitalized name for display ("Beginner").
    pub fn label(self) -> &'static str {
        match self {
            ExperienceTier::Beginner => "Beginner",
            ExperienceTier::Intermediate => "Intermediate",
            ExperienceTier::Advanced => "Advanced",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExperienceTier::Beginner => "wider stops, closer targets and shorter holds",
            ExperienceTier::Intermediate => "balanced stops, targets and holds",
            ExperienceTier::Advanced => "tighter stops, extended targets and longer holds",
        }
    }
}

impl fmt::Display for ExperienceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperienceTier::Beginner => write!(f, "beginner"),
            ExperienceTier::Intermediate => write!(f, "intermediate"),
            ExperienceTier::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for ExperienceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(ExperienceTier::Beginner),
            "intermediate" => Ok(ExperienceTier::Intermediate),
            "advanced" => Ok(ExperienceTier::Advanced),
            other => Err(format!("Unknown experience level: {other}")),
        }
    }
}

/// What the trader asked for: a fixed tier, or inference from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ExperiencePreference {
    #[default]
    Auto,
    Fixed(ExperienceTier),
}

impl fmt::Display for ExperiencePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperiencePreference::Auto => write!(f, "auto"),
            ExperiencePreference::Fixed(tier) => write!(f, "{tier}"),
        }
    }
}

impl FromStr for ExperiencePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(ExperiencePreference::Auto);
        }
        s.parse().map(ExperiencePreference::Fixed)
    }
}

impl From<ExperiencePreference> for String {
    fn from(p: ExperiencePreference) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for ExperiencePreference {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_tiers() {
        let b = ExperienceTier::Beginner.multipliers();
        assert_eq!((b.stop_loss, b.target, b.hold_time), (1.2, 0.8, 0.8));
        let i = ExperienceTier::Intermediate.multipliers();
        assert_eq!((i.stop_loss, i.target, i.hold_time), (1.0, 1.0, 1.0));
        let a = ExperienceTier::Advanced.multipliers();
        assert_eq!((a.stop_loss, a.target, a.hold_time), (0.8, 1.2, 1.2));
    }

    #[test]
    fn parses_preferences() {
        assert_eq!("auto".parse::<ExperiencePreference>(), Ok(ExperiencePreference::Auto));
        assert_eq!(
            "Advanced".parse::<ExperiencePreference>(),
            Ok(ExperiencePreference::Fixed(ExperienceTier::Advanced))
        );
        assert!("expert".parse::<ExperiencePreference>().is_err());
    }

    #[test]
    fn preference_serde_as_string() {
        let json = serde_json::to_string(&ExperiencePreference::Fixed(ExperienceTier::Beginner)).unwrap();
        assert_eq!(json, "\"beginner\"");
        let back: ExperiencePreference = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(back, ExperiencePreference::Auto);
    }
}
