//! Task tools: listing, lookup and lifecycle.

use super::{ToolContext, ToolHandler, get_bool, make_tool, optional_string, require_task_id};
use crate::error::TaskError;
use crate::filter::{FilterSpec, parse_priority_value};
use crate::format::{OutputFormat, format_task_markdown, format_tree_markdown, markdown_to_json};
use crate::types::{MarkDoneOutcome, NewTask, TaskPatch, TaskStatus};
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::{Value, json};

const PRIORITY_VALUES: [&str; 5] = ["low", "medium", "high", "very_high", "critical"];

/// Priority accepted by name or as its numeric value.
fn priority_schema(description: &str) -> Value {
    json!({
        "oneOf": [
            { "type": "string", "enum": PRIORITY_VALUES },
            { "type": "integer", "minimum": 1, "maximum": 5 }
        ],
        "description": description
    })
}

pub fn get_tools() -> Vec<Tool> {
    vec![
        make_tool(
            "list_tasks",
            "List your tasks as a tree. Filters apply at every level; sort applies to root tasks only.",
            json!({
                "status": {
                    "type": "string",
                    "enum": ["open", "done"],
                    "description": "Only tasks with this status"
                },
                "priority": priority_schema("Only tasks with this priority"),
                "search": {
                    "type": "string",
                    "description": "Case-insensitive text matched against title and description"
                },
                "sort": {
                    "type": "object",
                    "description": "Up to two sort keys for root tasks",
                    "properties": {
                        "field1": { "type": "string", "enum": ["created_at", "completed_at", "priority"] },
                        "order1": { "type": "string", "enum": ["asc", "desc"] },
                        "field2": { "type": "string", "enum": ["created_at", "completed_at", "priority"] },
                        "order2": { "type": "string", "enum": ["asc", "desc"] }
                    }
                },
                "format": {
                    "type": "string",
                    "enum": ["json", "markdown"],
                    "description": "Output format (default: server setting)"
                }
            }),
            vec![],
        ),
        make_tool(
            "get",
            "Get a single task by ID, optionally with its complete subtree.",
            json!({
                "task": {
                    "type": "integer",
                    "description": "Task ID"
                },
                "children": {
                    "type": "boolean",
                    "description": "Include all descendants, unfiltered"
                },
                "format": {
                    "type": "string",
                    "enum": ["json", "markdown"],
                    "description": "Output format (default: server setting)"
                }
            }),
            vec!["task"],
        ),
        make_tool(
            "create",
            "Create an open task. Use parent to nest it under one of your open tasks.",
            json!({
                "title": {
                    "type": "string",
                    "description": "Task title (1-255 characters)"
                },
                "description": {
                    "type": "string",
                    "description": "Task description"
                },
                "priority": priority_schema("Task priority (default: medium)"),
                "parent": {
                    "type": "integer",
                    "description": "Parent task ID"
                }
            }),
            vec!["title"],
        ),
        make_tool(
            "update",
            "Update a task's fields. Setting status to done requires every descendant to be done; pass parent: null to move a task to the root level.",
            json!({
                "task": {
                    "type": "integer",
                    "description": "Task ID"
                },
                "title": {
                    "type": "string",
                    "description": "New title"
                },
                "description": {
                    "type": "string",
                    "description": "New description"
                },
                "status": {
                    "type": "string",
                    "enum": ["open", "done"],
                    "description": "New status"
                },
                "priority": priority_schema("New priority"),
                "parent": {
                    "type": ["integer", "null"],
                    "description": "New parent task ID, or null for root"
                }
            }),
            vec!["task"],
        ),
        make_tool(
            "done",
            "Mark a task as done. Refused while any descendant is still open.",
            json!({
                "task": {
                    "type": "integer",
                    "description": "Task ID"
                }
            }),
            vec!["task"],
        ),
        make_tool(
            "delete",
            "Delete an open task together with all of its descendants. Done tasks cannot be deleted.",
            json!({
                "task": {
                    "type": "integer",
                    "description": "Task ID"
                }
            }),
            vec!["task"],
        ),
    ]
}

pub fn list_tasks(handler: &ToolHandler, args: Value, ctx: &ToolContext) -> Result<Value> {
    let format = handler.format_for(&args)?;
    let filter = FilterSpec::from_value(&args)?;

    let forest = handler.engine.list_tasks(&handler.owner, &filter)?;
    ctx.logger.debug(&format!("Listed {} root tasks", forest.len()));

    match format {
        OutputFormat::Markdown => Ok(markdown_to_json(format_tree_markdown(&forest))),
        OutputFormat::Json => Ok(json!({ "tasks": forest })),
    }
}

pub fn get(handler: &ToolHandler, args: Value, _ctx: &ToolContext) -> Result<Value> {
    let task_id = require_task_id(&args, "task")?;
    let include_children = get_bool(&args, "children").unwrap_or(false);
    let format = handler.format_for(&args)?;

    if include_children {
        let tree = handler.engine.get_task_tree(&handler.owner, task_id)?;
        match format {
            OutputFormat::Markdown => Ok(markdown_to_json(format_tree_markdown(&[tree]))),
            OutputFormat::Json => Ok(serde_json::to_value(tree)?),
        }
    } else {
        let task = handler.engine.get_task(&handler.owner, task_id)?;
        match format {
            OutputFormat::Markdown => Ok(markdown_to_json(format_task_markdown(&task))),
            OutputFormat::Json => Ok(serde_json::to_value(task)?),
        }
    }
}

pub fn create(handler: &ToolHandler, args: Value, ctx: &ToolContext) -> Result<Value> {
    let title =
        optional_string(&args, "title")?.ok_or_else(|| TaskError::missing_field("title"))?;
    let mut fields = NewTask::new(title);
    if let Some(description) = optional_string(&args, "description")? {
        fields = fields.with_description(description);
    }
    if let Some(priority) = args.get("priority").filter(|v| !v.is_null()) {
        fields = fields.with_priority(parse_priority_value(priority)?);
    }
    if args.get("parent").is_some_and(|v| !v.is_null()) {
        fields = fields.with_parent(require_task_id(&args, "parent")?);
    }

    let task = handler.engine.create_task(&handler.owner, fields)?;
    ctx.logger.info(&format!("Created task {}", task.id));

    Ok(json!({
        "task_id": task.id,
        "parent_id": task.parent_id,
        "title": task.title,
        "status": task.status.as_str(),
        "priority": task.priority.as_str(),
        "created_at": task.created_at
    }))
}

pub fn update(handler: &ToolHandler, args: Value, ctx: &ToolContext) -> Result<Value> {
    let task_id = require_task_id(&args, "task")?;
    let task = handler.engine.get_task(&handler.owner, task_id)?;

    let status = match optional_string(&args, "status")? {
        None => None,
        Some(s) => Some(TaskStatus::parse(&s).ok_or_else(|| {
            TaskError::invalid_value("status", format!("Invalid status '{}'", s))
        })?),
    };
    let priority = match args.get("priority") {
        None | Some(Value::Null) => None,
        Some(v) => Some(parse_priority_value(v)?),
    };
    let parent_id = match args.get("parent") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(_) => Some(Some(require_task_id(&args, "parent")?)),
    };

    let patch = TaskPatch {
        title: optional_string(&args, "title")?,
        description: optional_string(&args, "description")?,
        status,
        priority,
        parent_id,
    };
    if patch.is_empty() {
        return Ok(serde_json::to_value(task)?);
    }

    let updated = handler.engine.update_task(&task, patch)?;
    ctx.logger.info(&format!("Updated task {}", updated.id));

    Ok(serde_json::to_value(updated)?)
}

pub fn done(handler: &ToolHandler, args: Value, ctx: &ToolContext) -> Result<Value> {
    let task_id = require_task_id(&args, "task")?;
    let task = handler.engine.get_task(&handler.owner, task_id)?;

    let outcome = handler.engine.mark_done(&task)?;
    match &outcome {
        MarkDoneOutcome::IncompleteDescendants { blocking_task } => {
            ctx.logger.notice_with_data(
                outcome.message(),
                json!({ "task_id": task_id, "blocking_task": blocking_task }),
            );
        }
        _ => ctx.logger.info(&format!("Task {}: {}", task_id, outcome.message())),
    }

    let mut result = serde_json::to_value(&outcome)?;
    if let Some(obj) = result.as_object_mut() {
        obj.insert("success".to_string(), json!(outcome.is_success()));
        obj.insert("message".to_string(), json!(outcome.message()));
    }
    Ok(result)
}

pub fn delete(handler: &ToolHandler, args: Value, ctx: &ToolContext) -> Result<Value> {
    let task_id = require_task_id(&args, "task")?;
    let task = handler.engine.get_task(&handler.owner, task_id)?;

    if let Err(e) = handler.engine.delete_task(&task) {
        ctx.logger.warning(&format!("Delete of task {} refused: {}", task_id, e));
        return Err(e.into());
    }
    ctx.logger.info(&format!("Deleted task {} and its subtree", task_id));

    Ok(json!({
        "success": true,
        "deleted": task_id
    }))
}
