use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use trade_journal::cli::{parse_date, Cli, Commands};
use trade_journal::config::Config;
use trade_journal::core::position_planner::{PlanLevels, PositionPlanner};
use trade_journal::models::ExperiencePreference;
use trade_journal::trading::{Journal, SuggestionEngine, TradeAnalyzer};

fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let cli = Cli::parse();
    run_command(&cfg, cli.command)
}

fn run_command(cfg: &Config, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Suggest {
            journal,
            level,
            as_of,
            json,
        } => {
            let journal = Journal::load(&journal)?;
            let preference = match level {
                Some(l) => l.parse::<ExperiencePreference>().map_err(|e| anyhow!(e))?,
                None => journal
                    .account
                    .as_ref()
                    .and_then(|a| a.experience_level)
                    .unwrap_or_default(),
            };
            let as_of = parse_date(&as_of)
                .map_err(|e| anyhow!(e))?
                .unwrap_or_else(Utc::now);

            info!(
                "Suggesting from {} trades ({} closed), level={}, as of {}",
                journal.trades.len(),
                journal.closed_count(),
                preference,
                as_of.to_rfc3339()
            );

            let engine = SuggestionEngine::new(cfg);
            if json {
                let breakdown = engine.suggest_detailed(&journal.trades, preference, as_of);
                println!("{}", serde_json::to_string_pretty(&breakdown)?);
            } else {
                println!("{}", engine.suggest(&journal.trades, preference, as_of));
            }
        }
        Commands::Plan {
            entry,
            support,
            resistance,
            use_levels,
            balance,
            journal,
            json,
        } => {
            let balance = match (balance, journal) {
                (Some(b), _) => b,
                (None, Some(path)) => Journal::load(&path)?
                    .account
                    .map(|a| a.balance())
                    .with_context(|| format!("{} has no account section", path.display()))?,
                (None, None) => bail!("Provide --balance or a --journal with an account section"),
            };

            let levels = PlanLevels {
                support,
                resistance,
                use_support_resistance: use_levels,
            };
            let plan = PositionPlanner::new(cfg).plan(entry, &levels, balance)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("Entry:    ${:.2}", plan.entry_price);
                println!("Stop:     ${:.2}", plan.stop_price);
                println!("Target:   ${:.2}", plan.target_price);
                println!(
                    "Shares:   {} (max position ${:.2})",
                    plan.shares, plan.max_position_value
                );
                println!("Risk:     ${:.2}", plan.risk_amount);
                println!("Reward:   ${:.2}", plan.reward_amount);
                println!("R:R       1:{:.2}", plan.reward_risk_ratio);
            }
        }
        Commands::Stats { journal, json } => {
            let journal = Journal::load(&journal)?;
            let analyzer = TradeAnalyzer::new(cfg);
            let analysis = analyzer.analyze(&journal.trades);

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
                return Ok(());
            }

            let o = &analysis.overall;
            println!(
                "Closed trades: {}  W/L: {}/{}  Win rate: {:.1}%  Total P&L: ${:.2}",
                o.total,
                o.wins,
                o.losses,
                o.win_rate * 100.0,
                o.total_pnl
            );
            println!(
                "Avg win: ${:.2}  Avg loss: ${:.2}  Payoff: {:.2}  Profit factor: {:.2}  Edge: ${:.2}",
                o.avg_win, o.avg_loss, o.payoff_ratio, o.profit_factor, o.edge
            );
            for (dim, buckets) in &analysis.dimensions {
                println!();
                println!("{dim}:");
                for b in buckets.values() {
                    let flag = if b.sample_sufficient { "" } else { " (small sample)" };
                    println!(
                        "  {:<22} n={:<4} wr={:>5.1}%  edge={:+.2}{}",
                        b.value,
                        b.total,
                        b.win_rate * 100.0,
                        b.edge,
                        flag
                    );
                }
            }

            let weak = analyzer.get_negative_edge_buckets(&analysis);
            if !weak.is_empty() {
                println!();
                println!("Negative edge:");
                for b in weak.iter().take(5) {
                    println!("  {}={} edge={:+.2} (n={})", b.dimension, b.value, b.edge, b.total);
                }
            }
        }
    }
    Ok(())
}
