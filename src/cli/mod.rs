//! CLI command definitions for task-tree
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::error::{TaskError, TaskResult};
use crate::filter::FilterSpec;
use crate::format::OutputFormat;
use crate::types::{NewTask, Priority, TaskId, TaskPatch, TaskStatus};
use clap::{Args, Parser, Subcommand};

/// Per-user hierarchical task tree: MCP server and CLI tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Owner the command acts for (overrides config)
    #[arg(short, long, global = true)]
    pub owner: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format (overrides config)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the MCP server (default if no subcommand given)
    Serve,

    /// Show the task tree
    List(ListArgs),

    /// Show one task with its full subtree
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Create a task
    Create(CreateArgs),

    /// Update a task's fields
    Update(UpdateArgs),

    /// Mark a task as done
    Done {
        /// Task ID
        id: TaskId,
    },

    /// Delete an open task and its subtree
    Delete {
        /// Task ID
        id: TaskId,
    },

    /// Create a small demo tree for the owner
    Seed,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only tasks with this status (open, done)
    #[arg(long)]
    pub status: Option<String>,

    /// Only tasks with this priority (name or 1-5)
    #[arg(long)]
    pub priority: Option<String>,

    /// Case-insensitive text search over title and description
    #[arg(long)]
    pub search: Option<String>,

    /// Sort key for root tasks, e.g. `priority:desc`. Repeat for a second key.
    #[arg(long = "sort")]
    pub sort: Vec<String>,
}

impl ListArgs {
    pub fn to_filter(&self) -> TaskResult<FilterSpec> {
        let mut filter = FilterSpec::new();
        if let Some(status) = &self.status {
            filter = filter.with_status(parse_status(status)?);
        }
        if let Some(priority) = &self.priority {
            filter = filter.with_priority(parse_priority(priority)?);
        }
        if let Some(search) = &self.search {
            filter = filter.with_search(search.as_str());
        }
        filter.with_sort_args(&self.sort)
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Task title
    pub title: String,

    /// Task description
    #[arg(long)]
    pub description: Option<String>,

    /// Priority (low, medium, high, very_high, critical or 1-5)
    #[arg(long)]
    pub priority: Option<String>,

    /// Parent task ID
    #[arg(long)]
    pub parent: Option<TaskId>,
}

impl CreateArgs {
    pub fn to_new_task(&self) -> TaskResult<NewTask> {
        let mut fields = NewTask::new(self.title.as_str());
        if let Some(description) = &self.description {
            fields = fields.with_description(description.as_str());
        }
        if let Some(priority) = &self.priority {
            fields = fields.with_priority(parse_priority(priority)?);
        }
        if let Some(parent) = self.parent {
            fields = fields.with_parent(parent);
        }
        Ok(fields)
    }
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Task ID
    pub id: TaskId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    /// New status (open, done)
    #[arg(long)]
    pub status: Option<String>,

    /// Move under this parent
    #[arg(long, conflicts_with = "root")]
    pub parent: Option<TaskId>,

    /// Move to the root level
    #[arg(long)]
    pub root: bool,
}

impl UpdateArgs {
    pub fn to_patch(&self) -> TaskResult<TaskPatch> {
        let parent_id = if self.root {
            Some(None)
        } else {
            self.parent.map(Some)
        };
        Ok(TaskPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.as_deref().map(parse_status).transpose()?,
            priority: self.priority.as_deref().map(parse_priority).transpose()?,
            parent_id,
        })
    }
}

fn parse_status(s: &str) -> TaskResult<TaskStatus> {
    TaskStatus::parse(s)
        .ok_or_else(|| TaskError::invalid_value("status", format!("Invalid status '{}'", s)))
}

fn parse_priority(s: &str) -> TaskResult<Priority> {
    Priority::parse(s)
        .ok_or_else(|| TaskError::invalid_value("priority", format!("Invalid priority '{}'", s)))
}
