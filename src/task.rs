//! Task and category data structures.
//!
//! This module defines the core `Task` record with its timing, priority,
//! category and parent/subtask metadata, plus the `Category` grouping label.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::Priority;

/// A user-created to-do item.
///
/// Tasks support a two-level hierarchy (parent -> subtasks), an optional
/// timezone-aware deadline, and an optional category reference. The category
/// reference is weak: deleting a category clears it rather than deleting the
/// task, while deleting a parent cascades into its subtasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Timezone-aware deadline; absent means "no deadline". Naive values in
    /// the store are a data defect and are repaired on load, never written.
    pub due_date: Option<DateTime<Utc>>,
    /// Weak reference to a `Category` id.
    pub category: Option<u64>,
    /// Self-reference forming the parent -> subtask hierarchy. Never the
    /// task's own id, and never part of a cycle (enforced at write time).
    pub parent: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Task {
    /// True if this task is a direct subtask of `parent_id`.
    pub fn is_subtask_of(&self, parent_id: u64) -> bool {
        self.parent == Some(parent_id)
    }
}

/// A named grouping label attachable to tasks.
///
/// Names are not enforced unique; get-or-create lookup by exact name keeps
/// them effectively so.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}
