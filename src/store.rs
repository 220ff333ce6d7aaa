//! Task storage contract consumed by the engine.
//!
//! The engine never talks SQL. It reads and writes through [`TaskStore`] and
//! wraps multi-step mutations in [`TransactionalStore::atomically`] so that a
//! subtree is read and written against one consistent snapshot.

use crate::filter::{Predicate, TaskComparator};
use crate::types::{NewTaskRecord, Task, TaskId};
use anyhow::Result;

/// Keyed storage of task records.
///
/// Ordered results use store-default order (creation order) unless a
/// comparator is supplied.
pub trait TaskStore {
    /// Root tasks of `owner` matching `predicate`, ordered by `comparator`
    /// when given.
    fn find_roots(
        &self,
        owner: &str,
        predicate: &Predicate,
        comparator: Option<&TaskComparator>,
    ) -> Result<Vec<Task>>;

    /// Direct children of `task_id` matching `predicate`, in store order.
    fn find_children(&self, task_id: TaskId, predicate: &Predicate) -> Result<Vec<Task>>;

    /// All direct children of `task_id`, in store order.
    fn find_children_unfiltered(&self, task_id: TaskId) -> Result<Vec<Task>>;

    fn get(&self, task_id: TaskId) -> Result<Option<Task>>;

    /// Persist a new open task, assigning its id and timestamps.
    fn insert(&self, record: NewTaskRecord) -> Result<Task>;

    /// Overwrite the mutable columns of an existing task.
    /// Returns false if no row was updated.
    fn update(&self, task: &Task) -> Result<bool>;

    /// Delete a task and every descendant. Returns false if nothing was deleted.
    fn delete_subtree(&self, task_id: TaskId) -> Result<bool>;

    fn exists(&self, task_id: TaskId, owner: &str) -> Result<bool>;
}

/// A store that can run a unit of work inside one serializable transaction.
pub trait TransactionalStore: TaskStore {
    /// Run `f` against a transaction-scoped view of the store.
    /// Commits when `f` returns `Ok`, rolls back otherwise.
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn TaskStore) -> Result<T>;
}
