//! MCP tool implementations.

pub mod context;
pub mod tasks;

pub use context::ToolContext;

use crate::db::Database;
use crate::engine::TaskEngine;
use crate::error::TaskError;
use crate::format::OutputFormat;
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::Value;
use std::sync::Arc;

/// Tool handler that processes MCP tool calls for one owner.
pub struct ToolHandler {
    pub engine: Arc<TaskEngine<Database>>,
    /// Identity every call acts on behalf of.
    pub owner: String,
    pub default_format: OutputFormat,
}

impl ToolHandler {
    pub fn new(
        engine: Arc<TaskEngine<Database>>,
        owner: impl Into<String>,
        default_format: OutputFormat,
    ) -> Self {
        Self {
            engine,
            owner: owner.into(),
            default_format,
        }
    }

    /// Get all available tools.
    pub fn get_tools(&self) -> Vec<Tool> {
        tasks::get_tools()
    }

    /// Call a tool by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        ctx: &ToolContext,
    ) -> Result<Value> {
        match name {
            "list_tasks" => tasks::list_tasks(self, arguments, ctx),
            "get" => tasks::get(self, arguments, ctx),
            "create" => tasks::create(self, arguments, ctx),
            "update" => tasks::update(self, arguments, ctx),
            "done" => tasks::done(self, arguments, ctx),
            "delete" => tasks::delete(self, arguments, ctx),
            _ => Err(TaskError::unknown_tool(name).into()),
        }
    }

    /// Format requested by the call, falling back to the configured default.
    pub(crate) fn format_for(&self, args: &Value) -> Result<OutputFormat> {
        match optional_string(args, "format")? {
            None => Ok(self.default_format),
            Some(s) => OutputFormat::parse(&s).ok_or_else(|| {
                TaskError::invalid_value("format", format!("Unknown format '{}'", s)).into()
            }),
        }
    }
}

/// Helper to create a tool definition.
pub fn make_tool(name: &str, description: &str, properties: Value, required: Vec<&str>) -> Tool {
    let input_schema = rmcp::model::JsonObject::from_iter([
        ("type".to_string(), serde_json::json!("object")),
        ("properties".to_string(), properties),
        ("required".to_string(), serde_json::json!(required)),
    ]);

    Tool::new(name.to_string(), description.to_string(), input_schema)
}

/// Optional string argument; absent and null are `None`, any other non-string is rejected.
pub fn optional_string(args: &Value, key: &str) -> Result<Option<String>, TaskError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(TaskError::invalid_value(key, format!("'{}' must be a string", key))),
    }
}

/// Helper to get a bool from arguments.
pub fn get_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(|v| v.as_bool())
}

/// Required task id argument. Accepts an integer or a numeric string.
pub fn require_task_id(args: &Value, key: &str) -> Result<i64, TaskError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(TaskError::missing_field(key)),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| TaskError::invalid_value(key, "Task id must be an integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| TaskError::invalid_value(key, format!("Invalid task id '{}'", s))),
        Some(_) => Err(TaskError::invalid_value(key, "Task id must be an integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn optional_string_rejects_other_types() {
        let args = json!({"title": "Walk", "empty": null, "count": 3, "flag": true});
        assert_eq!(optional_string(&args, "title").unwrap().as_deref(), Some("Walk"));
        assert_eq!(optional_string(&args, "empty").unwrap(), None);
        assert_eq!(optional_string(&args, "absent").unwrap(), None);

        let err = optional_string(&args, "count").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("count"));
        assert!(optional_string(&args, "flag").is_err());
    }

    #[test]
    fn task_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(require_task_id(&json!({"task": 7}), "task").unwrap(), 7);
        assert_eq!(require_task_id(&json!({"task": " 12 "}), "task").unwrap(), 12);
    }

    #[test]
    fn task_id_errors_are_validation_errors() {
        let missing = require_task_id(&json!({}), "task").unwrap_err();
        assert_eq!(missing.code, ErrorCode::MissingRequiredField);

        let bad = require_task_id(&json!({"task": "abc"}), "task").unwrap_err();
        assert_eq!(bad.code, ErrorCode::InvalidFieldValue);
        assert_eq!(bad.field.as_deref(), Some("task"));
    }
}
