//! # tt - Personal Task Tracker CLI
//!
//! A command-line task tracker with categories, priorities, due dates and
//! parent/subtask relationships.
//!
//! ## Key Features
//!
//! - **Ranked List View**: overdue tasks first, then due-today, then
//!   future-dated; no-deadline tasks next and completed tasks last
//! - **Conjunctive Filters**: free-text search, priority, category,
//!   completion state and due-today, combined with AND
//! - **Two-Level Hierarchy**: parent tasks with subtasks and a completion
//!   percentage; deleting a parent removes its subtasks
//! - **Categories**: get-or-create grouping labels with an independent
//!   lifecycle; deleting one detaches tasks instead of deleting them
//! - **Bulk Actions**: complete or delete a comma-separated ID selection
//! - **Local File Storage**: a single JSON file, written atomically
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! tt add "File the tax return" --due 2026-09-15T17:00 --priority high --category Finance
//!
//! # List tasks (ranked), filter and page
//! tt list
//! tt list --search tax --incomplete --page 1
//!
//! # Complete, inspect, delete
//! tt toggle 3
//! tt view 3
//! tt delete 3
//!
//! # Bulk actions
//! tt bulk complete 4,5,9
//! ```
//!
//! Data is stored in `~/.tasktrack/tasks.json` (override with `--db`). Due
//! dates are entered as local `YYYY-MM-DDTHH:MM` and stored timezone-aware.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod engine;
pub mod fields;
pub mod task;

use cli::Cli;
use cmd::*;
use db::{Database, StoreError};

fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        if let Err(e) = cmd_completions(*shell) {
            eprintln!("{e}");
            std::process::exit(1);
        }
        return;
    }

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let dir = PathBuf::from(home).join(".tasktrack");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Failed to create store directory {}: {e}", dir.display());
            std::process::exit(1);
        }
        dir.join("tasks.json")
    });

    if let Err(e) = run(cli.command, &db_path) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(command: Commands, db_path: &std::path::Path) -> Result<(), StoreError> {
    let mut db = Database::load(db_path)?;

    match command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Add {
            title,
            desc,
            notes,
            due,
            priority,
            category,
            parent,
        } => cmd_add(&mut db, db_path, title, desc, notes, due, priority, category, parent),

        Commands::List {
            search,
            priority,
            category,
            completed,
            incomplete,
            due_today,
            page,
        } => cmd_list(&db, search, priority, category, completed, incomplete, due_today, page),

        Commands::View { id } => cmd_view(&db, id),

        Commands::Edit {
            id,
            title,
            desc,
            notes,
            due,
            priority,
            category,
            parent,
            clear_due,
            clear_category,
            clear_parent,
        } => cmd_edit(
            &mut db, db_path, id, title, desc, notes, due, priority, category, parent,
            clear_due, clear_category, clear_parent,
        ),

        Commands::Toggle { id } => cmd_toggle(&mut db, db_path, id),

        Commands::Delete { id } => cmd_delete(&mut db, db_path, id),

        Commands::Bulk { action, ids } => cmd_bulk(&mut db, db_path, action, ids),

        Commands::Category { action } => cmd_category(&mut db, db_path, action),

        Commands::Stats => cmd_stats(&db),
    }
}
