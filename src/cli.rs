use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed task tracker CLI.
///
/// The store is a single JSON file. Resolution order for its location:
/// `--db`, then the `TASKTRACK_DB` environment variable, then the default
/// `~/.tasktrack/tasks.json` (the directory is created on first use).
#[derive(Parser)]
#[command(name = "tt", version, about = "Personal task tracking CLI")]
pub struct Cli {
    /// Path to the JSON store file. Falls back to $TASKTRACK_DB, then
    /// ~/.tasktrack/tasks.json.
    #[arg(long, global = true, env = "TASKTRACK_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
