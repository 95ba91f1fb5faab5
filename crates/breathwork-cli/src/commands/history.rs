use breathwork_core::session::format_elapsed;
use breathwork_core::storage::Database;
use breathwork_core::{DisplayText, EnglishText};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List finished sessions, newest first
    List {
        /// Maximum number of sessions
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the rounds of one session
    Show {
        /// Session ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Aggregate statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Stored titles are resource keys for built-in plans and literal text for
/// custom ones.
fn title_text(raw: &str) -> String {
    DisplayText::resource(raw).resolve(&EnglishText)
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { limit, json } => {
            let rows = db.list_sessions(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No sessions yet.");
                return Ok(());
            }
            for row in rows {
                println!(
                    "#{:<4} {}  {:>8}  {} rounds  {}",
                    row.id,
                    row.completed_at.format("%Y-%m-%d %H:%M"),
                    format_elapsed(row.total_ms),
                    row.round_count,
                    title_text(&row.title),
                );
            }
        }
        HistoryAction::Show { id, json } => {
            let Some(summary) = db.session(id)? else {
                return Err(format!("session not found: {id}").into());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!("{}", title_text(&summary.title));
            println!("Completed: {}", summary.completed_at.to_rfc3339());
            for (i, round) in summary.rounds.iter().enumerate() {
                let expected = round
                    .expected_ms
                    .map(format_elapsed)
                    .unwrap_or_else(|| "open".to_string());
                println!(
                    "  {:>2}. {:<16} {:>8} (expected {expected})",
                    i + 1,
                    round.round_type.as_str(),
                    format_elapsed(round.actual_ms),
                );
            }
            println!("Total: {}", format_elapsed(summary.total_ms()));
        }
        HistoryAction::Stats { json } => {
            let stats = db.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            println!(
                "Sessions: {} ({} today)",
                stats.total_sessions, stats.today_sessions
            );
            println!(
                "Time:     {} ({} today)",
                format_elapsed(stats.total_ms),
                format_elapsed(stats.today_ms)
            );
            if let Some(hold) = stats.longest_hold_ms {
                println!("Longest hold: {}", format_elapsed(hold));
            }
            for (round_type, ms) in &stats.by_round_type {
                println!("  {round_type:<16} {:>8}", format_elapsed(*ms));
            }
        }
    }
    Ok(())
}
