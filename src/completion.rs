//! Completion checks: a task may become `done` only when its whole subtree is.

use crate::hierarchy::FullSubtree;
use crate::types::{TaskId, TaskStatus, TaskTree};

/// Decision for a mark-done request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCheck {
    Ready,
    /// `blocking_task` is the first open descendant found, depth-first.
    Blocked { blocking_task: TaskId },
}

impl CompletionCheck {
    pub fn is_ready(&self) -> bool {
        matches!(self, CompletionCheck::Ready)
    }
}

/// Check whether the root of `subtree` may transition to `done`.
///
/// The root's own status is not consulted; only its descendants are.
pub fn check(subtree: &FullSubtree) -> CompletionCheck {
    match first_open_descendant(subtree.tree()) {
        Some(blocking_task) => CompletionCheck::Blocked { blocking_task },
        None => CompletionCheck::Ready,
    }
}

pub fn can_complete(subtree: &FullSubtree) -> bool {
    check(subtree).is_ready()
}

/// Depth-first search for an open descendant, stopping at the first one.
fn first_open_descendant(tree: &TaskTree) -> Option<TaskId> {
    for child in &tree.children {
        match child.task.status {
            TaskStatus::Open => return Some(child.task.id),
            TaskStatus::Done => {}
        }
        if let Some(id) = first_open_descendant(child) {
            return Some(id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, Task};

    fn node(id: TaskId, status: TaskStatus, children: Vec<TaskTree>) -> TaskTree {
        TaskTree {
            task: Task {
                id,
                owner_id: "u1".into(),
                parent_id: None,
                title: format!("task {}", id),
                description: String::new(),
                status,
                priority: Priority::Medium,
                completed_at: status.is_done().then_some(1),
                created_at: 1,
                updated_at: 1,
            },
            children,
        }
    }

    fn subtree(tree: TaskTree) -> FullSubtree {
        FullSubtree::assume_complete(tree)
    }

    #[test]
    fn leaf_is_always_completable() {
        assert!(can_complete(&subtree(node(1, TaskStatus::Open, vec![]))));
    }

    #[test]
    fn open_child_blocks() {
        let tree = node(
            1,
            TaskStatus::Open,
            vec![
                node(2, TaskStatus::Done, vec![]),
                node(3, TaskStatus::Open, vec![]),
            ],
        );
        assert_eq!(
            check(&subtree(tree)),
            CompletionCheck::Blocked { blocking_task: 3 }
        );
    }

    #[test]
    fn open_grandchild_blocks_even_when_children_are_done() {
        let tree = node(
            1,
            TaskStatus::Open,
            vec![node(
                2,
                TaskStatus::Done,
                vec![node(3, TaskStatus::Open, vec![])],
            )],
        );
        assert_eq!(
            check(&subtree(tree)),
            CompletionCheck::Blocked { blocking_task: 3 }
        );
    }

    #[test]
    fn fully_done_subtree_is_ready() {
        let tree = node(
            1,
            TaskStatus::Open,
            vec![
                node(2, TaskStatus::Done, vec![node(4, TaskStatus::Done, vec![])]),
                node(3, TaskStatus::Done, vec![]),
            ],
        );
        assert!(can_complete(&subtree(tree)));
    }

    #[test]
    fn reports_first_blocker_in_depth_first_order() {
        let tree = node(
            1,
            TaskStatus::Open,
            vec![
                node(2, TaskStatus::Done, vec![node(5, TaskStatus::Open, vec![])]),
                node(3, TaskStatus::Open, vec![]),
            ],
        );
        assert_eq!(
            check(&subtree(tree)),
            CompletionCheck::Blocked { blocking_task: 5 }
        );
    }
}
