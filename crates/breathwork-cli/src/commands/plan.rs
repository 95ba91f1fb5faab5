use breathwork_core::session::format_elapsed;
use breathwork_core::{Config, EnglishText};
use clap::Subcommand;

use super::describe_duration;

#[derive(Subcommand)]
pub enum PlanAction {
    /// Print the plan sessions will run
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let plan = config.plan();

    match action {
        PlanAction::Show { json: true } => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        PlanAction::Show { json: false } => {
            println!("{}", plan.title().resolve(&EnglishText));
            for (i, round) in plan.rounds().iter().enumerate() {
                let start = if i == 0 || round.starts_automatically {
                    "auto"
                } else {
                    "manual"
                };
                println!(
                    "  {:>2}. {:<16} {:>8}  {start}",
                    i + 1,
                    round.round_type,
                    describe_duration(round.duration),
                );
            }
            println!(
                "{} rounds, {} fixed, {} open",
                plan.len(),
                format_elapsed(plan.total_fixed_ms()),
                plan.open_round_count(),
            );
        }
    }
    Ok(())
}
