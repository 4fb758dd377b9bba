use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "trade-journal",
    about = "Stop-loss, target and hold-time suggestions from your trade journal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Suggest stop loss, target and hold time from journal history
    Suggest {
        /// Journal export (JSON array of trades, or {"trades": [...], "account": {...}})
        #[arg(long, env = "TRADE_JOURNAL_FILE")]
        journal: PathBuf,
        /// Experience level: auto, beginner, intermediate, advanced (defaults to the account's setting, then auto)
        #[arg(long)]
        level: Option<String>,
        /// Evaluate as of this time (YYYY-MM-DD or RFC3339), defaults to now
        #[arg(long)]
        as_of: Option<String>,
        /// Print the full breakdown as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plan stop, target and size for an entry price
    Plan {
        #[arg(long)]
        entry: f64,
        #[arg(long)]
        support: Option<f64>,
        #[arg(long)]
        resistance: Option<f64>,
        /// Place stop and target off support/resistance instead of the fixed 5% / 1:3 plan
        #[arg(long)]
        use_levels: bool,
        /// Account balance; read from the journal's account when omitted
        #[arg(long)]
        balance: Option<f64>,
        #[arg(long, env = "TRADE_JOURNAL_FILE")]
        journal: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Win rate, payoff and edge by direction, weekday and session
    Stats {
        #[arg(long, env = "TRADE_JOURNAL_FILE")]
        journal: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

pub fn parse_date(s: &Option<String>) -> Result<Option<DateTime<Utc>>, String> {
    match s {
        None => Ok(None),
        Some(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                    return Ok(Some(dt.and_utc()));
                }
            }
            Err(format!("Invalid date format: {s}. Use YYYY-MM-DD or RFC3339"))
        }
    }
}
