//! Output formatting utilities for markdown and JSON.

use crate::types::{Task, TaskTree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output format for query results.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

fn checkbox(task: &Task) -> &'static str {
    if task.is_done() { "[x]" } else { "[ ]" }
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## {} {}\n", checkbox(task), task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **priority**: {}\n", task.priority));

    if let Some(parent_id) = task.parent_id {
        md.push_str(&format!("- **parent_id**: `{}`\n", parent_id));
    }

    if let Some(completed_at) = task.completed_at {
        md.push_str(&format!("- **completed_at**: {}\n", format_timestamp(completed_at)));
    }

    md.push_str(&format!("- **created_at**: {}\n", format_timestamp(task.created_at)));

    if !task.description.is_empty() {
        md.push_str("\n### Description\n");
        md.push_str(&task.description);
        md.push('\n');
    }

    md
}

/// Format a task forest as a nested markdown checklist.
pub fn format_tree_markdown(forest: &[TaskTree]) -> String {
    let total: usize = forest.iter().map(TaskTree::len).sum();
    let mut md = format!("# Tasks ({})\n\n", total);
    for tree in forest {
        push_tree_lines(&mut md, tree, 0);
    }
    md
}

fn push_tree_lines(md: &mut String, tree: &TaskTree, depth: usize) {
    let task = &tree.task;
    md.push_str(&format!(
        "{}- {} {} `#{}` ({})\n",
        "  ".repeat(depth),
        checkbox(task),
        task.title,
        task.id,
        task.priority,
    ));
    for child in &tree.children {
        push_tree_lines(md, child, depth + 1);
    }
}

fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Convert markdown to JSON value for uniform response handling.
pub fn markdown_to_json(md: String) -> Value {
    serde_json::json!({
        "format": "markdown",
        "content": md
    })
}
