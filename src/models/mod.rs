pub mod direction;
pub mod experience;
pub mod trade;

pub use direction::*;
pub use experience::{ExperiencePreference, ExperienceTier, Multipliers};
pub use trade::{AccountProfile, PostExitAnalysis, ProfitLoss, Trade};
