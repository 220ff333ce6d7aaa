//! Task lifecycle operations.
//!
//! Every operation takes the owner or task explicitly; there is no ambient
//! "current user". Capability checks happen before these calls.

use crate::completion::{self, CompletionCheck};
use crate::db::now_ms;
use crate::error::{TaskError, TaskResult};
use crate::filter::FilterSpec;
use crate::hierarchy::{self, DEFAULT_MAX_DEPTH};
use crate::store::{TaskStore, TransactionalStore};
use crate::types::{
    MarkDoneOutcome, NewTask, NewTaskRecord, Task, TaskId, TaskPatch, TaskStatus, TaskTree,
};
use tracing::{info, warn};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Hierarchy engine over a transactional task store.
#[derive(Clone)]
pub struct TaskEngine<S> {
    store: S,
    max_depth: usize,
}

impl<S: TransactionalStore> TaskEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Filtered task forest for `owner`. Sorting applies to roots only.
    pub fn list_tasks(&self, owner: &str, filter: &FilterSpec) -> TaskResult<Vec<TaskTree>> {
        hierarchy::assemble(&self.store, owner, filter, self.max_depth)
    }

    /// A single task visible to `owner`.
    pub fn get_task(&self, owner: &str, task_id: TaskId) -> TaskResult<Task> {
        self.store
            .get(task_id)?
            .filter(|t| t.owner_id == owner)
            .ok_or_else(|| TaskError::task_not_found(task_id))
    }

    /// A task visible to `owner` with its complete, unfiltered subtree.
    pub fn get_task_tree(&self, owner: &str, task_id: TaskId) -> TaskResult<TaskTree> {
        let task = self.get_task(owner, task_id)?;
        let subtree = hierarchy::load_subtree(&self.store, task, self.max_depth)?;
        Ok(subtree.into_tree())
    }

    /// Create an open task for `owner`, optionally under one of the owner's tasks.
    pub fn create_task(&self, owner: &str, fields: NewTask) -> TaskResult<Task> {
        if owner.trim().is_empty() {
            return Err(TaskError::invalid_value(
                "owner",
                "Owner identifier must not be empty",
            ));
        }
        let record = NewTaskRecord {
            owner_id: owner.to_string(),
            parent_id: fields.parent_id,
            title: validate_title(&fields.title)?,
            description: fields.description.unwrap_or_default(),
            priority: fields.priority.unwrap_or_default(),
        };

        let max_depth = self.max_depth;

        let task = self.store.atomically(|store| {
            if let Some(parent_id) = record.parent_id {
                if !store.exists(parent_id, owner)? {
                    return Err(TaskError::parent_not_found(parent_id).into());
                }
                ensure_parent_open(store, parent_id)?;
                ensure_fits_below(store, parent_id, 0, max_depth)?;
            }
            store.insert(record)
        })?;

        info!(
            task_id = task.id,
            owner = %owner,
            parent_id = ?task.parent_id,
            "Created task"
        );
        Ok(task)
    }

    /// Apply a partial update. Id, owner and creation time never change.
    pub fn update_task(&self, task: &Task, patch: TaskPatch) -> TaskResult<Task> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let max_depth = self.max_depth;

        let updated = self.store.atomically(|store| {
            let current = store
                .get(task.id)?
                .ok_or_else(|| TaskError::task_not_found(task.id))?;
            let mut updated = current.clone();

            if let Some(title) = title {
                updated.title = title;
            }
            if let Some(description) = patch.description {
                updated.description = description;
            }
            if let Some(priority) = patch.priority {
                updated.priority = priority;
            }

            if let Some(new_parent) = patch.parent_id
                && new_parent != current.parent_id
            {
                if let Some(parent_id) = new_parent {
                    if !store.exists(parent_id, &current.owner_id)? {
                        return Err(TaskError::invalid_reference(format!(
                            "Parent task {} does not exist or belongs to another owner",
                            parent_id
                        ))
                        .into());
                    }
                    if hierarchy::is_self_or_descendant(store, current.id, parent_id, max_depth)? {
                        return Err(TaskError::invalid_reference(format!(
                            "Task {} cannot be moved under itself or its descendant {}",
                            current.id, parent_id
                        ))
                        .into());
                    }
                    let subtree = hierarchy::load_subtree(store, current.clone(), max_depth)?;
                    ensure_fits_below(store, parent_id, subtree.tree().height(), max_depth)?;
                }
                updated.parent_id = new_parent;
            }

            let new_status = patch.status.unwrap_or(current.status);
            match (current.status, new_status) {
                (TaskStatus::Open, TaskStatus::Done) => {
                    let subtree = hierarchy::load_subtree(store, current.clone(), max_depth)?;
                    if let CompletionCheck::Blocked { blocking_task } = completion::check(&subtree)
                    {
                        return Err(
                            TaskError::incomplete_descendants(current.id, blocking_task).into()
                        );
                    }
                    updated.status = TaskStatus::Done;
                    updated.completed_at = Some(now_ms());
                }
                (TaskStatus::Done, TaskStatus::Open) => {
                    updated.status = TaskStatus::Open;
                    updated.completed_at = None;
                }
                (TaskStatus::Open, TaskStatus::Open) | (TaskStatus::Done, TaskStatus::Done) => {}
            }

            if updated.status == TaskStatus::Open
                && let Some(parent_id) = updated.parent_id
            {
                ensure_parent_open(store, parent_id)?;
            }

            if !store.update(&updated)? {
                return Err(TaskError::task_not_found(task.id).into());
            }
            store
                .get(task.id)?
                .ok_or_else(|| TaskError::task_not_found(task.id).into())
        })?;

        info!(task_id = updated.id, owner = %updated.owner_id, "Updated task");
        Ok(updated)
    }

    /// Transition a task to `done` if its whole subtree is already done.
    ///
    /// Refusal is reported as [`MarkDoneOutcome::IncompleteDescendants`], not as an error.
    pub fn mark_done(&self, task: &Task) -> TaskResult<MarkDoneOutcome> {
        let max_depth = self.max_depth;

        let outcome = self.store.atomically(|store| {
            let current = store
                .get(task.id)?
                .ok_or_else(|| TaskError::task_not_found(task.id))?;
            if current.is_done() {
                return Ok(MarkDoneOutcome::AlreadyDone { task: current });
            }

            let subtree = hierarchy::load_subtree(store, current, max_depth)?;
            match completion::check(&subtree) {
                CompletionCheck::Blocked { blocking_task } => {
                    Ok(MarkDoneOutcome::IncompleteDescendants { blocking_task })
                }
                CompletionCheck::Ready => {
                    let mut done = subtree.into_tree().task;
                    done.status = TaskStatus::Done;
                    done.completed_at = Some(now_ms());
                    store.update(&done)?;
                    let task = store
                        .get(done.id)?
                        .ok_or_else(|| TaskError::task_not_found(done.id))?;
                    Ok(MarkDoneOutcome::Completed { task })
                }
            }
        })?;

        match &outcome {
            MarkDoneOutcome::Completed { task } => {
                info!(task_id = task.id, owner = %task.owner_id, "Task marked as done");
            }
            MarkDoneOutcome::AlreadyDone { task } => {
                info!(task_id = task.id, "Task was already done");
            }
            MarkDoneOutcome::IncompleteDescendants { blocking_task } => {
                warn!(
                    task_id = task.id,
                    blocking_task = *blocking_task,
                    "Completion refused: incomplete descendants"
                );
            }
        }
        Ok(outcome)
    }

    /// Delete an open task and its whole subtree. Done tasks cannot be deleted.
    pub fn delete_task(&self, task: &Task) -> TaskResult<()> {
        let result = self.store.atomically(|store| {
            let current = store
                .get(task.id)?
                .ok_or_else(|| TaskError::task_not_found(task.id))?;
            if current.is_done() {
                return Err(TaskError::task_completed(current.id).into());
            }
            if !store.delete_subtree(current.id)? {
                return Err(TaskError::task_not_found(current.id).into());
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                info!(task_id = task.id, owner = %task.owner_id, "Deleted task subtree");
                Ok(())
            }
            Err(e) => {
                let err = TaskError::from(e);
                warn!(task_id = task.id, code = ?err.code, "Delete refused");
                Err(err)
            }
        }
    }
}

fn validate_title(title: &str) -> TaskResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskError::missing_field("title"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TaskError::invalid_value(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(title.to_string())
}

/// Open tasks may not be placed below a done task.
fn ensure_parent_open(store: &dyn TaskStore, parent_id: TaskId) -> anyhow::Result<()> {
    let parent = store
        .get(parent_id)?
        .ok_or_else(|| TaskError::parent_not_found(parent_id))?;
    if parent.is_done() {
        return Err(TaskError::parent_completed(parent_id).into());
    }
    Ok(())
}

/// A subtree `height` levels tall must still fit within `max_depth` under `parent_id`.
fn ensure_fits_below(
    store: &dyn TaskStore,
    parent_id: TaskId,
    height: usize,
    max_depth: usize,
) -> anyhow::Result<()> {
    let parent_depth = hierarchy::depth_of(store, parent_id, max_depth)?;
    if parent_depth + 1 + height > max_depth {
        return Err(TaskError::depth_limit_exceeded(parent_id, max_depth).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed_and_required() {
        assert_eq!(validate_title("  Write report ").unwrap(), "Write report");
        assert_eq!(
            validate_title("   ").unwrap_err().code,
            crate::error::ErrorCode::MissingRequiredField
        );
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(
            validate_title(&long).unwrap_err().code,
            crate::error::ErrorCode::InvalidFieldValue
        );
    }
}
