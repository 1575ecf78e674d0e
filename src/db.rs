//! File-backed store for tasks and categories.
//!
//! This module provides the `Database` struct persisted as a single JSON
//! file, along with due-date parsing/normalisation, the parent-cycle guard,
//! cascade and reference-clearing deletion rules, and the bulk operations.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::task::{Category, Task};

/// Faults surfaced by the store and the request-boundary validation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    TaskNotFound(u64),
    #[error("category '{0}' not found")]
    CategoryNotFound(String),
    #[error("a task cannot be its own parent")]
    SelfParent,
    #[error("setting task {parent} as parent of task {child} would create a cycle")]
    ParentCycle { child: u64, parent: u64 },
    #[error("unrecognised due date '{0}'; expected YYYY-MM-DDTHH:MM")]
    InvalidDueDate(String),
    #[error("failed to access the task store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse the task store: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory store for tasks and categories, persisted as JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Database {
    /// Load the store from a JSON file, creating an empty store if the file
    /// doesn't exist. Naive due dates found in the file are coerced to the
    /// local timezone and the corrected file is written back (best effort).
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path).and_then(|mut f| f.read_to_string(&mut buf))?;
        let mut value: Value = serde_json::from_str(&buf)?;
        let repaired = repair_naive_due_dates(&mut value);
        let db: Database = serde_json::from_value(value)?;
        if repaired > 0 {
            eprintln!("Repaired {repaired} naive due date(s) to timezone-aware.");
            if let Err(e) = db.save(path) {
                eprintln!("Could not persist due date repair: {e}");
            }
        }
        Ok(db)
    }

    /// Save the store using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available category ID.
    pub fn next_category_id(&self) -> u64 {
        self.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Look up a category by ID.
    pub fn category(&self, id: u64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Look up a category by exact name.
    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Find a category by exact name, creating it if absent. Returns its ID.
    pub fn get_or_create_category(&mut self, name: &str) -> u64 {
        if let Some(c) = self.category_by_name(name) {
            return c.id;
        }
        let id = self.next_category_id();
        self.categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Delete a category by name. Tasks referencing it keep living; their
    /// category reference is cleared instead (SET NULL semantics).
    pub fn delete_category(&mut self, name: &str) -> Result<(), StoreError> {
        let Some(id) = self.category_by_name(name).map(|c| c.id) else {
            return Err(StoreError::CategoryNotFound(name.to_string()));
        };
        self.categories.retain(|c| c.id != id);
        for t in self.tasks.iter_mut() {
            if t.category == Some(id) {
                t.category = None;
            }
        }
        Ok(())
    }

    /// Check whether assigning `parent` to `child` would make the child its
    /// own ancestor. Rejects self-parenting outright.
    pub fn check_parent(&self, child: u64, parent: u64) -> Result<(), StoreError> {
        if child == parent {
            return Err(StoreError::SelfParent);
        }
        if self.get(parent).is_none() {
            return Err(StoreError::TaskNotFound(parent));
        }
        let mut cur = Some(parent);
        let mut hops = 0;
        while let Some(p) = cur {
            if p == child {
                return Err(StoreError::ParentCycle { child, parent });
            }
            cur = self.get(p).and_then(|t| t.parent);
            hops += 1;
            if hops > 64 {
                break;
            }
        }
        Ok(())
    }

    /// Delete a task and all of its descendant subtasks. Deleting an ID that
    /// doesn't exist is a no-op. Returns the number of tasks removed.
    pub fn delete_task(&mut self, id: u64) -> usize {
        if self.get(id).is_none() {
            return 0;
        }
        let child_map = build_children_map(&self.tasks);
        let mut doomed = HashSet::new();
        doomed.insert(id);
        collect_descendants(id, &child_map, &mut doomed);
        let before = self.tasks.len();
        self.tasks.retain(|t| !doomed.contains(&t.id));
        before - self.tasks.len()
    }

    /// Mark every task in `ids` completed. Unknown IDs are skipped; an empty
    /// set is a no-op. Returns the number of tasks actually updated.
    pub fn bulk_complete(&mut self, ids: &[u64], now: DateTime<Utc>) -> usize {
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        let mut updated = 0;
        for t in self.tasks.iter_mut() {
            if wanted.contains(&t.id) && !t.completed {
                t.completed = true;
                t.last_modified = now;
                updated += 1;
            }
        }
        updated
    }

    /// Delete every task in `ids`, cascading into subtasks. Unknown IDs are
    /// skipped; an empty set is a no-op. Returns the number removed.
    pub fn bulk_delete(&mut self, ids: &[u64]) -> usize {
        let mut removed = 0;
        for &id in ids {
            removed += self.delete_task(id);
        }
        removed
    }
}

/// Build a map of parent task IDs to their children's IDs.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<u64, Vec<u64>> {
    let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = t.parent {
            map.entry(p).or_default().push(t.id);
        }
    }
    for v in map.values_mut() {
        v.sort_unstable();
    }
    map
}

/// Recursively collect all descendant task IDs from a root task.
pub fn collect_descendants(root: u64, child_map: &BTreeMap<u64, Vec<u64>>, out: &mut HashSet<u64>) {
    if let Some(children) = child_map.get(&root) {
        for &c in children {
            if out.insert(c) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Parse a due date entered as `YYYY-MM-DDTHH:MM` (seconds tolerated),
/// interpreted in the local timezone and stored timezone-aware.
pub fn parse_due_input(s: &str) -> Result<DateTime<Utc>, StoreError> {
    let s = s.trim();
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| StoreError::InvalidDueDate(s.to_string()))?;
    localise(naive).ok_or_else(|| StoreError::InvalidDueDate(s.to_string()))
}

/// Interpret a naive timestamp in the local timezone. `None` only for
/// timestamps skipped by a DST transition.
fn localise(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Walk the raw store JSON and coerce any naive `due_date` string to a
/// timezone-aware one (local timezone, RFC 3339). Returns the repair count.
///
/// Runs before deserialisation so that awareness of the defect isn't lost:
/// once parsed into a `DateTime<Utc>` there is no telling whether the stored
/// text carried an offset.
pub fn repair_naive_due_dates(value: &mut Value) -> usize {
    let Some(tasks) = value.get_mut("tasks").and_then(Value::as_array_mut) else {
        return 0;
    };
    let mut repaired = 0;
    for task in tasks {
        let Some(raw) = task.get("due_date").and_then(Value::as_str) else {
            continue;
        };
        if DateTime::parse_from_rfc3339(raw).is_ok() {
            continue;
        }
        let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"));
        if let Ok(naive) = parsed {
            if let Some(aware) = localise(naive) {
                task["due_date"] = Value::String(aware.to_rfc3339());
                repaired += 1;
            }
        }
    }
    repaired
}

/// Split a comma-separated id list into ids, ignoring blanks and anything
/// non-numeric.
pub fn parse_id_list(s: &str) -> Vec<u64> {
    s.split(',')
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;
    use chrono::TimeZone;
    use serde_json::json;

    fn task(id: u64, parent: Option<u64>) -> Task {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Task {
            id,
            title: format!("task {id}"),
            description: String::new(),
            notes: String::new(),
            completed: false,
            priority: Priority::Medium,
            due_date: None,
            category: None,
            parent,
            created_at: created,
            last_modified: created,
        }
    }

    fn db_with(tasks: Vec<Task>) -> Database {
        Database {
            tasks,
            categories: Vec::new(),
        }
    }

    #[test]
    fn next_ids_start_at_one() {
        let db = Database::default();
        assert_eq!(db.next_task_id(), 1);
        assert_eq!(db.next_category_id(), 1);
    }

    #[test]
    fn get_or_create_category_is_idempotent() {
        let mut db = Database::default();
        let a = db.get_or_create_category("Work");
        let b = db.get_or_create_category("Work");
        assert_eq!(a, b);
        assert_eq!(db.categories.len(), 1);
        // Exact-name lookup: a different case makes a different category.
        let c = db.get_or_create_category("work");
        assert_ne!(a, c);
    }

    #[test]
    fn deleting_category_clears_references_but_keeps_tasks() {
        let mut db = db_with(vec![task(1, None), task(2, None)]);
        let cid = db.get_or_create_category("Home");
        db.get_mut(1).unwrap().category = Some(cid);
        db.delete_category("Home").unwrap();
        assert!(db.categories.is_empty());
        assert_eq!(db.tasks.len(), 2);
        assert_eq!(db.get(1).unwrap().category, None);
    }

    #[test]
    fn deleting_missing_category_is_an_error() {
        let mut db = Database::default();
        assert!(matches!(
            db.delete_category("nope"),
            Err(StoreError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn delete_cascades_into_subtasks() {
        let db_tasks = vec![task(1, None), task(2, Some(1)), task(3, Some(2)), task(4, None)];
        let mut db = db_with(db_tasks);
        let removed = db.delete_task(1);
        assert_eq!(removed, 3);
        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.tasks[0].id, 4);
    }

    #[test]
    fn delete_missing_task_is_a_noop() {
        let mut db = db_with(vec![task(1, None)]);
        assert_eq!(db.delete_task(99), 0);
        assert_eq!(db.tasks.len(), 1);
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let db = db_with(vec![task(1, None), task(2, Some(1)), task(3, Some(2))]);
        assert!(matches!(db.check_parent(5, 5), Err(StoreError::SelfParent)));
        // 1 is an ancestor of 3, so 3 cannot become 1's parent.
        assert!(matches!(
            db.check_parent(1, 3),
            Err(StoreError::ParentCycle { child: 1, parent: 3 })
        ));
        assert!(db.check_parent(3, 1).is_ok());
        assert!(matches!(
            db.check_parent(1, 42),
            Err(StoreError::TaskNotFound(42))
        ));
    }

    #[test]
    fn bulk_complete_touches_only_selected_tasks() {
        let mut db = db_with(vec![task(1, None), task(2, None), task(3, None)]);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let updated = db.bulk_complete(&[1, 2], now);
        assert_eq!(updated, 2);
        assert!(db.get(1).unwrap().completed);
        assert!(db.get(2).unwrap().completed);
        assert!(!db.get(3).unwrap().completed);
        assert_eq!(db.get(1).unwrap().last_modified, now);

        // Empty set and unknown ids are no-ops.
        assert_eq!(db.bulk_complete(&[], now), 0);
        assert_eq!(db.bulk_complete(&[99], now), 0);
    }

    #[test]
    fn bulk_delete_cascades_and_skips_unknown_ids() {
        let mut db = db_with(vec![task(1, None), task(2, Some(1)), task(3, None)]);
        assert_eq!(db.bulk_delete(&[1, 77]), 2);
        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.tasks[0].id, 3);
        assert_eq!(db.bulk_delete(&[]), 0);
    }

    #[test]
    fn due_input_requires_date_and_time() {
        assert!(parse_due_input("2024-07-01T09:30").is_ok());
        assert!(parse_due_input(" 2024-07-01T09:30:15 ").is_ok());
        assert!(parse_due_input("2024-07-01").is_err());
        assert!(parse_due_input("tomorrow").is_err());
        assert!(parse_due_input("").is_err());
    }

    #[test]
    fn naive_due_dates_are_repaired_in_place() {
        let mut value = json!({
            "tasks": [
                { "id": 1, "title": "naive", "due_date": "2024-07-01T09:30:00" },
                { "id": 2, "title": "aware", "due_date": "2024-07-01T09:30:00+02:00" },
                { "id": 3, "title": "none", "due_date": null }
            ],
            "categories": []
        });
        let repaired = repair_naive_due_dates(&mut value);
        assert_eq!(repaired, 1);
        let fixed = value["tasks"][0]["due_date"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(fixed).is_ok());
        // The already-aware value is untouched.
        assert_eq!(
            value["tasks"][1]["due_date"].as_str().unwrap(),
            "2024-07-01T09:30:00+02:00"
        );
    }

    #[test]
    fn id_list_parsing_ignores_junk() {
        assert_eq!(parse_id_list("1,2,3"), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 4 , ,abc, 5"), vec![4, 5]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("tasktrack_test_{}.json", std::process::id()));
        let mut db = db_with(vec![task(1, None)]);
        db.get_or_create_category("Work");
        db.save(&path).unwrap();
        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.categories.len(), 1);
        let _ = fs::remove_file(&path);
    }
}
