//! Task ranking and filtering engine.
//!
//! Pure, side-effect-free transforms over an already-fetched collection of
//! tasks: derived status predicates (overdue / due today), the ordering rank
//! used as the primary sort key, conjunctive list filters, and aggregate
//! counts. Every function takes "now" explicitly; nothing here reads the
//! clock, touches the store, or mutates its input.

use chrono::{DateTime, Days, TimeZone, Utc};

use crate::fields::Priority;
use crate::task::{Category, Task};

/// Rank bucket for completed tasks: always last.
pub const RANK_COMPLETED: u32 = 999;
/// Rank bucket for incomplete tasks without a deadline: second to last.
pub const RANK_NO_DUE_DATE: u32 = 998;
/// Rank bucket for overdue tasks: always first.
pub const RANK_OVERDUE: u32 = 0;
/// Rank bucket for tasks due on the current calendar day.
pub const RANK_DUE_TODAY: u32 = 1;
/// Rank bucket for tasks with a future deadline.
pub const RANK_FUTURE: u32 = 2;

/// True if the task is incomplete and its deadline has passed.
pub fn is_overdue<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    if task.completed {
        return false;
    }
    match task.due_date {
        Some(due) => due < now.with_timezone(&Utc),
        None => false,
    }
}

/// True if the task is incomplete and its deadline falls on the same
/// calendar day as `now`, in `now`'s timezone.
pub fn is_due_today<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    if task.completed {
        return false;
    }
    match task.due_date {
        Some(due) => due.with_timezone(&now.timezone()).date_naive() == now.date_naive(),
        None => false,
    }
}

/// Primary sort key: overdue, then due today, then future-dated, then
/// no-deadline, then completed.
pub fn ordering_rank<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> u32 {
    if task.completed {
        RANK_COMPLETED
    } else if task.due_date.is_none() {
        RANK_NO_DUE_DATE
    } else if is_overdue(task, now) {
        RANK_OVERDUE
    } else if is_due_today(task, now) {
        RANK_DUE_TODAY
    } else {
        RANK_FUTURE
    }
}

/// Secondary sort key: the deadline, or a far-future sentinel (now + 365
/// days) so no-deadline tasks land after every dated task in their bucket.
pub fn effective_due_date<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> DateTime<Utc> {
    let now_utc = now.with_timezone(&Utc);
    task.due_date
        .unwrap_or_else(|| now_utc.checked_add_days(Days::new(365)).unwrap_or(now_utc))
}

/// Percentage of a task's direct subtasks that are completed, in [0, 100].
/// Zero when the task has no subtasks. Callers round for display.
pub fn subtask_progress(task_id: u64, tasks: &[Task]) -> f64 {
    let subtasks: Vec<&Task> = tasks.iter().filter(|t| t.is_subtask_of(task_id)).collect();
    if subtasks.is_empty() {
        return 0.0;
    }
    let done = subtasks.iter().filter(|t| t.completed).count();
    100.0 * done as f64 / subtasks.len() as f64
}

/// Filter criteria for the list view. Every field is independently optional;
/// unset fields are no-ops and set fields are combined with AND.
#[derive(Debug, Default, Clone)]
pub struct Criteria {
    /// Case-insensitive substring match on title or description. Empty or
    /// blank text is the same as unset.
    pub search: Option<String>,
    pub priority: Option<Priority>,
    /// Case-insensitive exact match on the category name. Tasks without a
    /// category never match a non-empty name; an empty or blank name is the
    /// same as unset.
    pub category: Option<String>,
    /// Tri-state: None = no filter, Some(true) = completed only,
    /// Some(false) = incomplete only.
    pub completed: Option<bool>,
    /// Keep only tasks due on the current calendar day.
    pub due_today: bool,
}

impl Criteria {
    fn matches<Tz: TimeZone>(
        &self,
        task: &Task,
        category_name: Option<&str>,
        now: &DateTime<Tz>,
    ) -> bool {
        if let Some(ref needle) = self.search {
            let needle = needle.trim().to_lowercase();
            if !needle.is_empty()
                && !task.title.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(p) = self.priority {
            if task.priority != p {
                return false;
            }
        }
        // An empty or blank category criterion means "no filter", the same
        // as an unset one.
        if let Some(wanted) = self.category.as_deref().map(str::trim) {
            if !wanted.is_empty() {
                match category_name {
                    Some(name) if name.eq_ignore_ascii_case(wanted) => {}
                    _ => return false,
                }
            }
        }
        if let Some(done) = self.completed {
            if task.completed != done {
                return false;
            }
        }
        if self.due_today && !is_due_today(task, now) {
            return false;
        }
        true
    }
}

/// Reduce and order a task collection for the list view.
///
/// Returns references into `tasks`, filtered by `criteria` and stably sorted
/// by `(ordering_rank, effective_due_date)`; ties keep input order.
pub fn filter_and_rank<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    categories: &[Category],
    criteria: &Criteria,
    now: &DateTime<Tz>,
) -> Vec<&'a Task> {
    let mut selected: Vec<&Task> = tasks
        .iter()
        .filter(|t| {
            let name = t
                .category
                .and_then(|cid| categories.iter().find(|c| c.id == cid))
                .map(|c| c.name.as_str());
            criteria.matches(t, name, now)
        })
        .collect();
    selected.sort_by_key(|t| (ordering_rank(t, now), effective_due_date(t, now)));
    selected
}

/// Aggregate counts over a task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
    pub due_today: usize,
}

/// Compute stats over any task collection (filtered or not) and an explicit
/// "now". No cached counters; recomputed per call.
pub fn compute_stats<'a, Tz, I>(tasks: I, now: &DateTime<Tz>) -> TaskStats
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a Task>,
{
    let mut stats = TaskStats::default();
    for t in tasks {
        stats.total += 1;
        if t.completed {
            stats.completed += 1;
        }
        if is_overdue(t, now) {
            stats.overdue += 1;
        }
        if is_due_today(t, now) {
            stats.due_today += 1;
        }
    }
    stats
}
