pub mod journal;
pub mod suggestion;
pub mod trade_analyzer;

pub use journal::{Journal, JournalError};
pub use suggestion::{Suggestion, SuggestionBreakdown, SuggestionEngine, INSUFFICIENT_DATA};
pub use trade_analyzer::{BucketStats, JournalAnalysis, TradeAnalyzer};
