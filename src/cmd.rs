//! Command implementations for the CLI interface.
//!
//! This module contains the command handlers behind every subcommand, from
//! basic CRUD on tasks and categories to the ranked list view and the bulk
//! actions. Handlers return a `StoreError` on hard faults; `main` reports it
//! and exits non-zero.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::db::*;
use crate::engine::{
    self, compute_stats, filter_and_rank, is_due_today, is_overdue, subtask_progress, Criteria,
};
use crate::fields::*;
use crate::task::Task;

/// Tasks shown per page by `list --page`.
const PAGE_SIZE: usize = 10;

/// Categories installed by `category seed`.
const DEFAULT_CATEGORIES: [&str; 8] = [
    "Work", "Personal", "Shopping", "Health", "Study", "Home", "Finance", "Travel",
];

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task. A blank title adds nothing.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,
        /// Due date and time: YYYY-MM-DDTHH:MM (local time).
        #[arg(long)]
        due: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Category name; created if it doesn't exist yet.
        #[arg(long)]
        category: Option<String>,
        /// Parent task ID, making this a subtask.
        #[arg(long)]
        parent: Option<u64>,
    },

    /// List tasks, ranked by overdue / due-today / future / no-date / done.
    List {
        /// Case-insensitive substring match on title or description.
        #[arg(long)]
        search: Option<String>,
        /// Priority filter: low | medium | high. Unknown values don't filter.
        #[arg(long)]
        priority: Option<String>,
        /// Category name filter (case-insensitive exact match).
        #[arg(long)]
        category: Option<String>,
        /// Show only completed tasks.
        #[arg(long, conflicts_with = "incomplete")]
        completed: bool,
        /// Show only incomplete tasks.
        #[arg(long)]
        incomplete: bool,
        /// Show only tasks due on the current calendar day.
        #[arg(long)]
        due_today: bool,
        /// Page number (10 tasks per page); omit to print everything.
        #[arg(long)]
        page: Option<usize>,
    },

    /// View a single task by ID.
    View {
        /// Task ID to view.
        id: u64,
    },

    /// Update fields on a task.
    Edit {
        /// Task ID to edit.
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Due date and time: YYYY-MM-DDTHH:MM (local time).
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Category name; created if it doesn't exist yet.
        #[arg(long)]
        category: Option<String>,
        /// Parent task ID.
        #[arg(long)]
        parent: Option<u64>,
        /// Clear the due date.
        #[arg(long)]
        clear_due: bool,
        /// Detach the task from its category.
        #[arg(long)]
        clear_category: bool,
        /// Detach the task from its parent.
        #[arg(long)]
        clear_parent: bool,
    },

    /// Flip a task's completed flag.
    Toggle {
        /// Task ID to toggle.
        id: u64,
    },

    /// Delete a task and its subtasks. A missing ID is a no-op.
    Delete {
        /// Task ID to delete.
        id: u64,
    },

    /// Apply an action to a set of tasks at once.
    Bulk {
        /// What to do with the selected tasks.
        #[arg(value_enum)]
        action: BulkAction,
        /// Comma-separated task IDs, e.g. "3,5,12". Empty selects nothing.
        ids: String,
    },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Show aggregate task counts.
    Stats,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Create a category (no-op if it already exists).
    Add {
        /// Category name.
        name: String,
    },
    /// List categories with task counts.
    List,
    /// Delete a category. Tasks keep living; their reference is cleared.
    Delete {
        /// Category name.
        name: String,
    },
    /// Install the default category set.
    Seed,
}

/// Add a new task to the store.
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    desc: Option<String>,
    notes: Option<String>,
    due: Option<String>,
    priority: Priority,
    category: Option<String>,
    parent: Option<u64>,
) -> Result<(), StoreError> {
    // A blank title silently creates nothing. Long-standing behaviour of the
    // create form; callers relying on it get a no-op, not a fault.
    if title.trim().is_empty() {
        return Ok(());
    }

    let due_date = due.as_deref().map(parse_due_input).transpose()?;
    let id = db.next_task_id();
    if let Some(pid) = parent {
        db.check_parent(id, pid)?;
    }
    let category = category
        .as_deref()
        .map(|name| db.get_or_create_category(name));

    let now = Utc::now();
    db.tasks.push(Task {
        id,
        title,
        description: desc.unwrap_or_default(),
        notes: notes.unwrap_or_default(),
        completed: false,
        priority,
        due_date,
        category,
        parent,
        created_at: now,
        last_modified: now,
    });
    db.save(db_path)?;
    println!("Added task {id}");
    Ok(())
}

/// List tasks through the ranking/filtering engine, with a stats footer.
pub fn cmd_list(
    db: &Database,
    search: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    completed: bool,
    incomplete: bool,
    due_today: bool,
    page: Option<usize>,
) -> Result<(), StoreError> {
    let criteria = Criteria {
        search,
        priority: priority.as_deref().and_then(parse_priority_filter),
        category,
        completed: match (completed, incomplete) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
        due_today,
    };
    let now = Local::now();
    let ranked = filter_and_rank(&db.tasks, &db.categories, &criteria, &now);

    let visible: &[&Task] = match page {
        Some(p) => {
            let start = p.saturating_sub(1) * PAGE_SIZE;
            let end = (start + PAGE_SIZE).min(ranked.len());
            if start >= ranked.len() {
                &[]
            } else {
                &ranked[start..end]
            }
        }
        None => &ranked,
    };

    print_table(db, visible, &now);

    let stats = compute_stats(ranked.iter().copied(), &now);
    println!(
        "\n{} task(s): {} completed, {} overdue, {} due today",
        stats.total, stats.completed, stats.overdue, stats.due_today
    );
    if let Some(p) = page {
        let pages = ranked.len().div_ceil(PAGE_SIZE).max(1);
        println!("Page {p} of {pages}");
    }
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: u64) -> Result<(), StoreError> {
    let task = db.get(id).ok_or(StoreError::TaskNotFound(id))?;
    let now = Local::now();

    println!("ID:            {}", task.id);
    println!("Title:         {}", task.title);
    println!("Completed:     {}", if task.completed { "yes" } else { "no" });
    println!("Priority:      {}", format_priority(task.priority));
    println!(
        "Category:      {}",
        task.category
            .and_then(|cid| db.category(cid))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "-".into())
    );
    println!(
        "Due:           {}",
        match task.due_date {
            Some(d) => format!(
                "{} ({})",
                d.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                format_due_relative(Some(d), &now)
            ),
            None => "-".into(),
        }
    );
    if is_overdue(task, &now) {
        println!("Status:        OVERDUE");
    } else if is_due_today(task, &now) {
        println!("Status:        due today");
    }
    println!(
        "Parent:        {}",
        task.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("Created:       {}", task.created_at.to_rfc3339());
    println!("Last modified: {}", task.last_modified.to_rfc3339());
    if !task.description.is_empty() {
        println!("Description:\n{}", task.description);
    }
    if !task.notes.is_empty() {
        println!("Notes:\n{}", task.notes);
    }

    let subtasks: Vec<&Task> = db.tasks.iter().filter(|t| t.is_subtask_of(id)).collect();
    if !subtasks.is_empty() {
        println!(
            "Subtasks ({:.0}% done):",
            subtask_progress(id, &db.tasks)
        );
        for s in subtasks {
            let mark = if s.completed { "x" } else { " " };
            println!("  [{mark}] {} (#{})", s.title, s.id);
        }
    }
    Ok(())
}

/// Update an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    db: &mut Database,
    db_path: &Path,
    id: u64,
    title: Option<String>,
    desc: Option<String>,
    notes: Option<String>,
    due: Option<String>,
    priority: Option<Priority>,
    category: Option<String>,
    parent: Option<u64>,
    clear_due: bool,
    clear_category: bool,
    clear_parent: bool,
) -> Result<(), StoreError> {
    if db.get(id).is_none() {
        return Err(StoreError::TaskNotFound(id));
    }
    let due_date = due.as_deref().map(parse_due_input).transpose()?;
    if let Some(pid) = parent {
        db.check_parent(id, pid)?;
    }
    let category_id = category
        .as_deref()
        .map(|name| db.get_or_create_category(name));

    let t = db.get_mut(id).ok_or(StoreError::TaskNotFound(id))?;
    if let Some(s) = title {
        if !s.trim().is_empty() {
            t.title = s;
        }
    }
    if let Some(d) = desc {
        t.description = d;
    }
    if let Some(n) = notes {
        t.notes = n;
    }
    if clear_due {
        t.due_date = None;
    }
    if let Some(d) = due_date {
        t.due_date = Some(d);
    }
    if let Some(p) = priority {
        t.priority = p;
    }
    if clear_category {
        t.category = None;
    }
    if let Some(cid) = category_id {
        t.category = Some(cid);
    }
    if clear_parent {
        t.parent = None;
    }
    if let Some(pid) = parent {
        t.parent = Some(pid);
    }
    t.last_modified = Utc::now();

    db.save(db_path)?;
    println!("Updated task {id}");
    Ok(())
}

/// Flip a task's completed flag. Missing IDs are a hard fault, matching edit.
pub fn cmd_toggle(db: &mut Database, db_path: &Path, id: u64) -> Result<(), StoreError> {
    let t = db.get_mut(id).ok_or(StoreError::TaskNotFound(id))?;
    t.completed = !t.completed;
    t.last_modified = Utc::now();
    let state = if t.completed { "completed" } else { "reopened" };
    db.save(db_path)?;
    println!("Task {id} {state}");
    Ok(())
}

/// Delete a task and its subtasks. Deleting a missing ID is a no-op.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: u64) -> Result<(), StoreError> {
    let removed = db.delete_task(id);
    if removed == 0 {
        println!("Nothing to delete.");
        return Ok(());
    }
    db.save(db_path)?;
    println!("Deleted {removed} task(s)");
    Ok(())
}

/// Apply a bulk action to a comma-separated ID selection.
pub fn cmd_bulk(
    db: &mut Database,
    db_path: &Path,
    action: BulkAction,
    ids: String,
) -> Result<(), StoreError> {
    let ids = parse_id_list(&ids);
    if ids.is_empty() {
        println!("No tasks selected.");
        return Ok(());
    }
    let touched = match action {
        BulkAction::Complete => db.bulk_complete(&ids, Utc::now()),
        BulkAction::Delete => db.bulk_delete(&ids),
    };
    if touched > 0 {
        db.save(db_path)?;
    }
    match action {
        BulkAction::Complete => println!("Completed {touched} task(s)"),
        BulkAction::Delete => println!("Deleted {touched} task(s)"),
    }
    Ok(())
}

/// Manage categories: add, list, delete, seed defaults.
pub fn cmd_category(
    db: &mut Database,
    db_path: &Path,
    action: CategoryAction,
) -> Result<(), StoreError> {
    match action {
        CategoryAction::Add { name } => {
            let existed = db.category_by_name(&name).is_some();
            db.get_or_create_category(&name);
            if existed {
                println!("Category already exists: {name}");
            } else {
                db.save(db_path)?;
                println!("Created category: {name}");
            }
        }
        CategoryAction::List => {
            for c in &db.categories {
                let count = db.tasks.iter().filter(|t| t.category == Some(c.id)).count();
                println!("{:<5} {:<20} {} task(s)", c.id, c.name, count);
            }
            println!("{} categor(ies)", db.categories.len());
        }
        CategoryAction::Delete { name } => {
            db.delete_category(&name)?;
            db.save(db_path)?;
            println!("Deleted category: {name}");
        }
        CategoryAction::Seed => {
            let mut created = 0;
            for name in DEFAULT_CATEGORIES {
                if db.category_by_name(name).is_none() {
                    db.get_or_create_category(name);
                    println!("Created category: {name}");
                    created += 1;
                } else {
                    println!("Category already exists: {name}");
                }
            }
            if created > 0 {
                db.save(db_path)?;
            }
            println!("Total categories: {}", db.categories.len());
        }
    }
    Ok(())
}

/// Show aggregate counts over the whole store.
pub fn cmd_stats(db: &Database) -> Result<(), StoreError> {
    let now = Local::now();
    let stats = compute_stats(&db.tasks, &now);
    println!("Total:     {}", stats.total);
    println!("Completed: {}", stats.completed);
    println!("Overdue:   {}", stats.overdue);
    println!("Due today: {}", stats.due_today);
    Ok(())
}

/// Generate shell completion scripts for the given shell.
pub fn cmd_completions(shell: Shell) -> Result<(), StoreError> {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

/// Format a due date relative to "now" ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative<Tz: TimeZone>(due: Option<DateTime<Utc>>, now: &DateTime<Tz>) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = d
                .with_timezone(&now.timezone())
                .date_naive()
                .signed_duration_since(now.date_naive())
                .num_days();
            if days == 0 {
                "today".into()
            } else if days == 1 {
                "tomorrow".into()
            } else if days > 1 {
                format!("in {days}d")
            } else {
                format!("{}d late", -days)
            }
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Print tasks in a formatted table.
fn print_table(db: &Database, tasks: &[&Task], now: &DateTime<Local>) {
    println!(
        "{:<5} {:<4} {:<7} {:<10} {:<14} {}",
        "ID", "Done", "Pri", "Due", "Category", "Title"
    );
    for t in tasks {
        let done = if t.completed { "[x]" } else { "[ ]" };
        let due = format_due_relative(t.due_date, now);
        let category = t
            .category
            .and_then(|cid| db.category(cid))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "-".into());
        let flag = if engine::is_overdue(t, now) {
            " !"
        } else if engine::is_due_today(t, now) {
            " *"
        } else {
            ""
        };
        println!(
            "{:<5} {:<4} {:<7} {:<10} {:<14} {}{}",
            t.id,
            done,
            format_priority(t.priority),
            due,
            truncate(&category, 14),
            t.title,
            flag
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn temp_db_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tasktrack_cmd_{tag}_{}.json", std::process::id()))
    }

    #[test]
    fn add_with_blank_title_is_a_silent_noop() {
        let path = temp_db_path("blank");
        let mut db = Database::default();
        cmd_add(
            &mut db,
            &path,
            "   ".to_string(),
            None,
            None,
            None,
            Priority::Medium,
            None,
            None,
        )
        .unwrap();
        assert!(db.tasks.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn add_rejects_unparseable_due_date() {
        let path = temp_db_path("baddue");
        let mut db = Database::default();
        let err = cmd_add(
            &mut db,
            &path,
            "dated".to_string(),
            None,
            None,
            Some("next tuesday".to_string()),
            Priority::Medium,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDueDate(_)));
        assert!(db.tasks.is_empty());
    }

    #[test]
    fn add_creates_category_on_the_fly() {
        let path = temp_db_path("cat");
        let mut db = Database::default();
        cmd_add(
            &mut db,
            &path,
            "report".to_string(),
            None,
            None,
            None,
            Priority::High,
            Some("Work".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.categories.len(), 1);
        assert_eq!(db.tasks[0].category, Some(db.categories[0].id));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn toggle_and_edit_fault_on_missing_id() {
        let path = temp_db_path("missing");
        let mut db = Database::default();
        assert!(matches!(
            cmd_toggle(&mut db, &path, 42),
            Err(StoreError::TaskNotFound(42))
        ));
        assert!(matches!(
            cmd_edit(
                &mut db, &path, 42, None, None, None, None, None, None, None, false, false,
                false
            ),
            Err(StoreError::TaskNotFound(42))
        ));
    }

    #[test]
    fn relative_due_formatting() {
        let now = Utc::now();
        assert_eq!(format_due_relative(None, &now), "-");
        assert_eq!(format_due_relative(Some(now), &now), "today");
        assert_eq!(
            format_due_relative(Some(now + Duration::days(1)), &now),
            "tomorrow"
        );
        assert_eq!(
            format_due_relative(Some(now + Duration::days(3)), &now),
            "in 3d"
        );
        assert_eq!(
            format_due_relative(Some(now - Duration::days(2)), &now),
            "2d late"
        );
    }
}
