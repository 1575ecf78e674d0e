//! Enumerations and field types for task records.
//!
//! This module defines the structured value types attached to tasks: the
//! priority scale and the bulk-action verbs accepted on the command line.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority of a task. Medium is the default on creation.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[serde(alias = "Low", alias = "L")]
    Low,
    #[default]
    #[serde(alias = "Medium", alias = "M")]
    Medium,
    #[serde(alias = "High", alias = "H")]
    High,
}

/// Lenient priority parse used by the list filter: anything that isn't one
/// of the three known levels disables the filter rather than erroring.
pub fn parse_priority_filter(s: &str) -> Option<Priority> {
    match s.trim().to_lowercase().as_str() {
        "low" | "l" => Some(Priority::Low),
        "medium" | "m" => Some(Priority::Medium),
        "high" | "h" => Some(Priority::High),
        _ => None,
    }
}

/// Format a priority level for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}

/// Verbs accepted by the `bulk` command.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BulkAction {
    /// Mark every selected task completed.
    Complete,
    /// Delete every selected task (cascading into subtasks).
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_filter_is_lenient() {
        assert_eq!(parse_priority_filter("high"), Some(Priority::High));
        assert_eq!(parse_priority_filter("  Medium "), Some(Priority::Medium));
        assert_eq!(parse_priority_filter("L"), Some(Priority::Low));
        // Unknown values mean "do not filter", not an error.
        assert_eq!(parse_priority_filter("urgent"), None);
        assert_eq!(parse_priority_filter(""), None);
    }
}
