//! Core types for the task hierarchy engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned task identifier.
pub type TaskId = i64;

/// Completion state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
        }
    }

    /// Parse a status name. `todo` is accepted as an alias of `open`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" | "todo" => Some(TaskStatus::Open),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority, ordered from least to most urgent.
///
/// Stored as its level (1..=5) so that SQL ordering and Rust ordering agree.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::VeryHigh,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::VeryHigh => "very_high",
            Priority::Critical => "critical",
        }
    }

    pub fn level(&self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::VeryHigh => 4,
            Priority::Critical => 5,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Priority::Low),
            2 => Some(Priority::Medium),
            3 => Some(Priority::High),
            4 => Some(Priority::VeryHigh),
            5 => Some(Priority::Critical),
            _ => None,
        }
    }

    /// Parse a priority from its name or numeric level ("high", "VERY-HIGH", "3").
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "very_high" | "veryhigh" => Some(Priority::VeryHigh),
            "critical" => Some(Priority::Critical),
            other => other.parse().ok().and_then(Priority::from_level),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task record as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner_id: String,
    pub parent_id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Set exactly when `status` is `done`.
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }
}

/// A task with its children for tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTree {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TaskTree>,
}

impl TaskTree {
    pub fn leaf(task: Task) -> Self {
        Self {
            task,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this tree, including the root.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TaskTree::len).sum::<usize>()
    }

    /// Levels below the root; 0 for a leaf.
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Always false: a tree holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Visit every node depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Task)) {
        visit(&self.task);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Caller-supplied fields for a new task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Validated record handed to the store for insertion.
/// The store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTaskRecord {
    pub owner_id: String,
    pub parent_id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// Partial update. `None` keeps the current value.
///
/// `parent_id` is doubly optional: `Some(None)` detaches the task to the root level.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub parent_id: Option<Option<TaskId>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.parent_id.is_none()
    }
}

/// Result of a mark-done request.
///
/// Refusal is a normal business outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MarkDoneOutcome {
    Completed { task: Task },
    AlreadyDone { task: Task },
    IncompleteDescendants { blocking_task: TaskId },
}

impl MarkDoneOutcome {
    /// Whether the task is `done` after the call.
    pub fn is_success(&self) -> bool {
        !matches!(self, MarkDoneOutcome::IncompleteDescendants { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            MarkDoneOutcome::Completed { .. } => "Task marked as done",
            MarkDoneOutcome::AlreadyDone { .. } => "Task was already done",
            MarkDoneOutcome::IncompleteDescendants { .. } => {
                "Some descendant tasks are not completed yet"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_names_and_levels() {
        assert_eq!(Priority::parse("high"), Some(Priority::High));
        assert_eq!(Priority::parse("VERY-HIGH"), Some(Priority::VeryHigh));
        assert_eq!(Priority::parse("veryhigh"), Some(Priority::VeryHigh));
        assert_eq!(Priority::parse("5"), Some(Priority::Critical));
        assert_eq!(Priority::parse("0"), None);
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn priority_order_follows_level() {
        let mut levels: Vec<i64> = Priority::ALL.iter().map(Priority::level).collect();
        levels.sort();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
        assert!(Priority::Low < Priority::Critical);
        assert!(Priority::High > Priority::Medium);
    }

    #[test]
    fn status_accepts_todo_alias() {
        assert_eq!(TaskStatus::parse("todo"), Some(TaskStatus::Open));
        assert_eq!(TaskStatus::parse(" Done "), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::parse("closed"), None);
    }

    #[test]
    fn tree_serializes_flattened_with_children() {
        let task = Task {
            id: 7,
            owner_id: "u1".into(),
            parent_id: None,
            title: "Root".into(),
            description: String::new(),
            status: TaskStatus::Open,
            priority: Priority::VeryHigh,
            completed_at: None,
            created_at: 1,
            updated_at: 1,
        };
        let value = serde_json::to_value(TaskTree::leaf(task)).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["priority"], "very_high");
        assert_eq!(value["status"], "open");
        assert!(value["children"].as_array().unwrap().is_empty());
    }
}
