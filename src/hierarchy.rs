//! Tree assembly over a [`TaskStore`].
//!
//! Two traversals live here and must not be mixed:
//! - [`assemble`] builds the filtered tree returned to callers. The filter
//!   applies at every level; the sort applies to root tasks only and children
//!   keep store order.
//! - [`load_subtree`] loads every descendant of one task, unfiltered, for the
//!   completion check. Its result is a [`FullSubtree`], which can only be
//!   produced by this traversal.

use crate::error::{TaskError, TaskResult};
use crate::filter::{FilterSpec, Predicate};
use crate::store::TaskStore;
use crate::types::{Task, TaskId, TaskTree};
use tracing::debug;

/// Default bound on tree depth during traversal.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// A task with all of its descendants loaded, unfiltered.
///
/// An empty child list here always means "no children", never "not fetched".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullSubtree(TaskTree);

impl FullSubtree {
    pub fn tree(&self) -> &TaskTree {
        &self.0
    }

    pub fn into_tree(self) -> TaskTree {
        self.0
    }

    /// Wrap a tree the caller asserts is complete.
    #[cfg(test)]
    pub(crate) fn assume_complete(tree: TaskTree) -> Self {
        Self(tree)
    }
}

/// Assemble the filtered task forest for `owner`.
///
/// Returns an empty vector when no root task matches.
pub fn assemble<S: TaskStore + ?Sized>(
    store: &S,
    owner: &str,
    filter: &FilterSpec,
    max_depth: usize,
) -> TaskResult<Vec<TaskTree>> {
    let predicate = filter.predicate();
    let comparator = filter.comparator();

    let roots = store.find_roots(owner, &predicate, comparator.as_ref())?;
    let mut forest = Vec::with_capacity(roots.len());
    for root in roots {
        let children = filtered_children(store, owner, root.id, &predicate, 1, max_depth)?;
        forest.push(TaskTree {
            task: root,
            children,
        });
    }

    debug!(
        owner = %owner,
        roots = forest.len(),
        nodes = forest.iter().map(TaskTree::len).sum::<usize>(),
        "Assembled task tree"
    );
    Ok(forest)
}

/// Children of `parent_id` passing `predicate`, each with its own filtered subtree.
fn filtered_children<S: TaskStore + ?Sized>(
    store: &S,
    owner: &str,
    parent_id: TaskId,
    predicate: &Predicate,
    depth: usize,
    max_depth: usize,
) -> TaskResult<Vec<TaskTree>> {
    let children = store.find_children(parent_id, predicate)?;
    if children.is_empty() {
        return Ok(Vec::new());
    }
    if depth > max_depth {
        return Err(TaskError::tree_too_deep(parent_id, max_depth));
    }

    let mut result = Vec::with_capacity(children.len());
    for child in children.into_iter().filter(|c| c.owner_id == owner) {
        let grandchildren =
            filtered_children(store, owner, child.id, predicate, depth + 1, max_depth)?;
        result.push(TaskTree {
            task: child,
            children: grandchildren,
        });
    }
    Ok(result)
}

/// Load `task` together with every descendant, ignoring any filter.
pub fn load_subtree<S: TaskStore + ?Sized>(
    store: &S,
    task: Task,
    max_depth: usize,
) -> TaskResult<FullSubtree> {
    let children = all_children(store, task.id, 1, max_depth)?;
    Ok(FullSubtree(TaskTree { task, children }))
}

fn all_children<S: TaskStore + ?Sized>(
    store: &S,
    parent_id: TaskId,
    depth: usize,
    max_depth: usize,
) -> TaskResult<Vec<TaskTree>> {
    let children = store.find_children_unfiltered(parent_id)?;
    if children.is_empty() {
        return Ok(Vec::new());
    }
    if depth > max_depth {
        return Err(TaskError::tree_too_deep(parent_id, max_depth));
    }

    let mut result = Vec::with_capacity(children.len());
    for child in children {
        let grandchildren = all_children(store, child.id, depth + 1, max_depth)?;
        result.push(TaskTree {
            task: child,
            children: grandchildren,
        });
    }
    Ok(result)
}

/// Depth of `task_id` below its root; roots sit at depth 0.
pub fn depth_of<S: TaskStore + ?Sized>(
    store: &S,
    task_id: TaskId,
    max_depth: usize,
) -> TaskResult<usize> {
    let mut depth = 0;
    let mut current = store.get(task_id)?.and_then(|t| t.parent_id);
    while let Some(id) = current {
        depth += 1;
        if depth > max_depth {
            return Err(TaskError::tree_too_deep(task_id, max_depth));
        }
        current = store.get(id)?.and_then(|t| t.parent_id);
    }
    Ok(depth)
}

/// Whether `candidate` is `task_id` itself or lies inside its subtree.
pub fn is_self_or_descendant<S: TaskStore + ?Sized>(
    store: &S,
    task_id: TaskId,
    candidate: TaskId,
    max_depth: usize,
) -> TaskResult<bool> {
    // Walk up from the candidate; cheaper than loading the whole subtree.
    let mut current = Some(candidate);
    let mut steps = 0;
    while let Some(id) = current {
        if id == task_id {
            return Ok(true);
        }
        if steps > max_depth {
            return Err(TaskError::tree_too_deep(candidate, max_depth));
        }
        current = store.get(id)?.and_then(|t| t.parent_id);
        steps += 1;
    }
    Ok(false)
}
