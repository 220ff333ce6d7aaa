//! Structured error types for engine operations.

use crate::types::TaskId;
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,
    ParentNotFound,

    // Reference errors
    InvalidReference,

    // Conflict errors
    TaskCompleted,
    ParentCompleted,
    IncompleteDescendants,
    DepthLimitExceeded,

    // Internal errors
    DatabaseError,
    TreeTooDeep,
    InternalError,
    UnknownTool,
}

/// Coarse error category, one per caller-visible failure class.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Reference,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue => {
                ErrorKind::Validation
            }
            ErrorCode::TaskNotFound | ErrorCode::ParentNotFound => ErrorKind::NotFound,
            ErrorCode::InvalidReference => ErrorKind::Reference,
            ErrorCode::TaskCompleted
            | ErrorCode::ParentCompleted
            | ErrorCode::IncompleteDescendants
            | ErrorCode::DepthLimitExceeded => ErrorKind::Conflict,
            ErrorCode::DatabaseError
            | ErrorCode::TreeTooDeep
            | ErrorCode::InternalError
            | ErrorCode::UnknownTool => ErrorKind::Internal,
        }
    }
}

/// Structured error for engine and tool responses.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct TaskError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TaskError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn task_not_found(task_id: TaskId) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn parent_not_found(parent_id: TaskId) -> Self {
        Self::new(
            ErrorCode::ParentNotFound,
            format!("Parent task not found: {}", parent_id),
        )
        .with_field("parent_id")
    }

    pub fn invalid_reference(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidReference, reason).with_field("parent_id")
    }

    pub fn task_completed(task_id: TaskId) -> Self {
        Self::new(
            ErrorCode::TaskCompleted,
            format!("Task {} is done and cannot be deleted", task_id),
        )
    }

    pub fn parent_completed(parent_id: TaskId) -> Self {
        Self::new(
            ErrorCode::ParentCompleted,
            format!("Parent task {} is done; open tasks cannot be placed under it", parent_id),
        )
        .with_field("parent_id")
    }

    pub fn incomplete_descendants(task_id: TaskId, blocking_task: TaskId) -> Self {
        Self::new(
            ErrorCode::IncompleteDescendants,
            format!("Task {} has incomplete descendants", task_id),
        )
        .with_details(format!("first open descendant: {}", blocking_task))
    }

    pub fn depth_limit_exceeded(parent_id: TaskId, max_depth: usize) -> Self {
        Self::new(
            ErrorCode::DepthLimitExceeded,
            format!(
                "Placing the task under {} would nest it deeper than {} levels",
                parent_id, max_depth
            ),
        )
        .with_field("parent_id")
    }

    pub fn tree_too_deep(task_id: TaskId, max_depth: usize) -> Self {
        Self::new(
            ErrorCode::TreeTooDeep,
            format!(
                "Subtree below task {} exceeds the maximum depth of {}",
                task_id, max_depth
            ),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorCode::UnknownTool, format!("Unknown tool: {}", name))
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        // Domain errors raised inside store closures come back wrapped
        match err.downcast::<TaskError>() {
            Ok(task_err) => task_err,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(db_err) => TaskError::database(db_err),
                Err(err) => TaskError::internal(err),
            },
        }
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(err: rusqlite::Error) -> Self {
        TaskError::database(err)
    }
}

/// Result type for engine operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_kinds() {
        assert_eq!(ErrorCode::MissingRequiredField.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::ParentNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::InvalidReference.kind(), ErrorKind::Reference);
        assert_eq!(ErrorCode::TaskCompleted.kind(), ErrorKind::Conflict);
        assert_eq!(ErrorCode::DepthLimitExceeded.kind(), ErrorKind::Conflict);
        assert_eq!(ErrorCode::TreeTooDeep.kind(), ErrorKind::Internal);
    }

    #[test]
    fn anyhow_round_trip_keeps_domain_error() {
        let wrapped: anyhow::Error = TaskError::task_completed(3).into();
        let err = TaskError::from(wrapped);

        assert_eq!(err.code, ErrorCode::TaskCompleted);
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let value = serde_json::to_value(TaskError::missing_field("title")).unwrap();

        assert_eq!(value["code"], "MISSING_REQUIRED_FIELD");
        assert_eq!(value["field"], "title");
        assert!(value.get("details").is_none());
    }
}
