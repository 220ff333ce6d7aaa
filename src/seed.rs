//! Demo data for a fresh database.

use crate::engine::TaskEngine;
use crate::error::TaskResult;
use crate::store::TransactionalStore;
use crate::types::{MarkDoneOutcome, NewTask, Priority, Task};
use tracing::info;

/// Create a small demo hierarchy for `owner`:
///
/// ```text
/// Root task 1 (medium)
/// ├── Sub task 1 (low)
/// │   └── Sub-sub task (high)
/// └── Sub task 2 (medium, done)
/// Root task 2 (high)
/// ```
///
/// Returns the created tasks in creation order.
pub fn seed_demo<S: TransactionalStore>(
    engine: &TaskEngine<S>,
    owner: &str,
) -> TaskResult<Vec<Task>> {
    let root1 = engine.create_task(
        owner,
        NewTask::new(format!("Root task 1 for {}", owner))
            .with_description("Description for root task 1")
            .with_priority(Priority::Medium),
    )?;
    let root2 = engine.create_task(
        owner,
        NewTask::new(format!("Root task 2 for {}", owner))
            .with_description("Description for root task 2")
            .with_priority(Priority::High),
    )?;
    let sub1 = engine.create_task(
        owner,
        NewTask::new("Sub task 1 for root task 1")
            .with_description("Description for sub task 1")
            .with_priority(Priority::Low)
            .with_parent(root1.id),
    )?;
    let sub2 = engine.create_task(
        owner,
        NewTask::new("Sub task 2 for root task 1")
            .with_description("Description for sub task 2")
            .with_priority(Priority::Medium)
            .with_parent(root1.id),
    )?;
    // A leaf always completes
    let sub2 = match engine.mark_done(&sub2)? {
        MarkDoneOutcome::Completed { task } | MarkDoneOutcome::AlreadyDone { task } => task,
        MarkDoneOutcome::IncompleteDescendants { .. } => sub2,
    };
    let subsub = engine.create_task(
        owner,
        NewTask::new("Sub-sub task for sub task 1")
            .with_description("Description for sub-sub task")
            .with_priority(Priority::High)
            .with_parent(sub1.id),
    )?;

    info!(owner = %owner, "Seeded demo tasks");
    Ok(vec![root1, root2, sub1, sub2, subsub])
}
