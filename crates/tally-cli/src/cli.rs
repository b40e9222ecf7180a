//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

/// Timesheet summaries and pie charts.
///
/// Reads every timesheet in the configured input directory, prints how the
/// day was spent per category, and writes one pie chart per day.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print summaries as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}
