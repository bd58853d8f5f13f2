//! Command-line interface for the headless runner.

use clap::Parser;
use std::path::PathBuf;

/// Run a toki battle from a JSON roster without any presentation
#[derive(Parser, Debug)]
#[command(name = "toki-headless")]
#[command(version)]
pub struct Args {
    /// JSON roster describing both teams
    #[arg(long, value_name = "ROSTER_FILE")]
    pub roster: PathBuf,

    /// Override the roster's RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the roster's turn limit
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Print the summary as JSON instead of the battle log
    #[arg(long)]
    pub json_summary: bool,

    /// Write the replay log of the battle to this path
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub replay: Option<PathBuf>,
}
