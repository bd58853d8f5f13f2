use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use toki_headless::cli::Args;
use toki_headless::{run_battle, RosterFile, RunOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let roster = RosterFile::load(&args.roster)?;
    let options = RunOptions {
        seed: args.seed,
        max_turns: args.max_turns,
    };
    let summary = run_battle(&roster, &options)?;

    if let Some(path) = &args.replay {
        let json = serde_json::to_string_pretty(&summary.replay)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write replay log to {}", path.display()))?;
        tracing::info!(path = %path.display(), "replay log written");
    }

    if args.json_summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for line in &summary.log {
            println!("{line}");
        }
        println!();
        println!(
            "{:?} after {} turns (seed {})",
            summary.outcome, summary.turns, summary.seed
        );
        for combatant in &summary.combatants {
            println!(
                "  {:<12} {:?}  {:>4}/{:<4} dealt {}",
                combatant.name,
                combatant.side,
                combatant.final_health,
                combatant.max_health,
                combatant.damage_dealt
            );
        }
    }
    Ok(())
}
