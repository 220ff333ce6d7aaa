//! Task queries and the SQLite implementation of the store contract.

use super::{Database, now_ms};
use crate::filter::{Predicate, TaskComparator};
use crate::store::{TaskStore, TransactionalStore};
use crate::types::{NewTaskRecord, Priority, Task, TaskId, TaskStatus};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, TransactionBehavior, params};
use tracing::debug;

/// Column list shared by every task query; `parse_task_row` reads by position.
const TASK_COLUMNS: &str = "id, owner_id, parent_id, title, description, status, priority, \
                            completed_at, created_at, updated_at";

/// Store-default order: creation order, id as tie-break for same-millisecond inserts.
const DEFAULT_ORDER: &str = " ORDER BY created_at, id";

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get(5)?;
    let status = TaskStatus::parse(&status)
        .ok_or_else(|| conversion_error(5, format!("unknown task status '{}'", status)))?;

    let priority: i64 = row.get(6)?;
    let priority = Priority::from_level(priority)
        .ok_or_else(|| conversion_error(6, format!("unknown priority level {}", priority)))?;

    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status,
        priority,
        completed_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Push the equality parts of a predicate into SQL so indexes can serve them.
/// The full predicate is still applied to the fetched rows.
fn push_predicate_conditions(
    sql: &mut String,
    params_vec: &mut Vec<Box<dyn ToSql>>,
    predicate: &Predicate,
) {
    if let Some(status) = predicate.status() {
        sql.push_str(" AND status = ?");
        params_vec.push(Box::new(status.as_str()));
    }
    if let Some(priority) = predicate.priority() {
        sql.push_str(" AND priority = ?");
        params_vec.push(Box::new(priority.level()));
    }
}

/// Store view over a borrowed connection or transaction.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query_tasks(&self, sql: &str, params_vec: &[Box<dyn ToSql>]) -> Result<Vec<Task>> {
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

        let mut stmt = self.conn.prepare(sql)?;
        let tasks = stmt
            .query_map(params_refs.as_slice(), parse_task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tasks)
    }
}

impl TaskStore for SqliteStore<'_> {
    fn find_roots(
        &self,
        owner: &str,
        predicate: &Predicate,
        comparator: Option<&TaskComparator>,
    ) -> Result<Vec<Task>> {
        let mut sql = format!(
            "SELECT {} FROM tasks WHERE owner_id = ? AND parent_id IS NULL",
            TASK_COLUMNS
        );
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(owner.to_string())];
        push_predicate_conditions(&mut sql, &mut params_vec, predicate);
        sql.push_str(DEFAULT_ORDER);

        let mut tasks = self.query_tasks(&sql, &params_vec)?;
        tasks.retain(|t| predicate.matches(t));
        if let Some(comparator) = comparator {
            comparator.sort(&mut tasks);
        }

        debug!(owner = %owner, count = tasks.len(), "Fetched root tasks");
        Ok(tasks)
    }

    fn find_children(&self, task_id: TaskId, predicate: &Predicate) -> Result<Vec<Task>> {
        let mut sql = format!("SELECT {} FROM tasks WHERE parent_id = ?", TASK_COLUMNS);
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(task_id)];
        push_predicate_conditions(&mut sql, &mut params_vec, predicate);
        sql.push_str(DEFAULT_ORDER);

        let mut tasks = self.query_tasks(&sql, &params_vec)?;
        tasks.retain(|t| predicate.matches(t));
        Ok(tasks)
    }

    fn find_children_unfiltered(&self, task_id: TaskId) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE parent_id = ?{}",
            TASK_COLUMNS, DEFAULT_ORDER
        );
        let params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(task_id)];
        self.query_tasks(&sql, &params_vec)
    }

    fn get(&self, task_id: TaskId) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
        let task = self
            .conn
            .query_row(&sql, params![task_id], parse_task_row)
            .optional()?;
        Ok(task)
    }

    fn insert(&self, record: NewTaskRecord) -> Result<Task> {
        let now = now_ms();

        self.conn.execute(
            "INSERT INTO tasks (
                owner_id, parent_id, title, description, status, priority,
                completed_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8)",
            params![
                &record.owner_id,
                record.parent_id,
                &record.title,
                &record.description,
                TaskStatus::Open.as_str(),
                record.priority.level(),
                now,
                now,
            ],
        )?;

        Ok(Task {
            id: self.conn.last_insert_rowid(),
            owner_id: record.owner_id,
            parent_id: record.parent_id,
            title: record.title,
            description: record.description,
            status: TaskStatus::Open,
            priority: record.priority,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn update(&self, task: &Task) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET
                parent_id = ?1, title = ?2, description = ?3, status = ?4,
                priority = ?5, completed_at = ?6, updated_at = ?7
            WHERE id = ?8",
            params![
                task.parent_id,
                &task.title,
                &task.description,
                task.status.as_str(),
                task.priority.level(),
                task.completed_at,
                now_ms(),
                task.id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_subtree(&self, task_id: TaskId) -> Result<bool> {
        // The CTE finds the task and everything reachable through parent_id
        let deleted = self.conn.execute(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM tasks WHERE id = ?1
                UNION ALL
                SELECT t.id FROM tasks t INNER JOIN subtree s ON t.parent_id = s.id
            )
            DELETE FROM tasks WHERE id IN (SELECT id FROM subtree)",
            params![task_id],
        )?;

        debug!(task_id, deleted, "Deleted task subtree");
        Ok(deleted > 0)
    }

    fn exists(&self, task_id: TaskId, owner: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1 AND owner_id = ?2)",
            params![task_id, owner],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl TaskStore for Database {
    fn find_roots(
        &self,
        owner: &str,
        predicate: &Predicate,
        comparator: Option<&TaskComparator>,
    ) -> Result<Vec<Task>> {
        self.with_conn(|conn| SqliteStore::new(conn).find_roots(owner, predicate, comparator))
    }

    fn find_children(&self, task_id: TaskId, predicate: &Predicate) -> Result<Vec<Task>> {
        self.with_conn(|conn| SqliteStore::new(conn).find_children(task_id, predicate))
    }

    fn find_children_unfiltered(&self, task_id: TaskId) -> Result<Vec<Task>> {
        self.with_conn(|conn| SqliteStore::new(conn).find_children_unfiltered(task_id))
    }

    fn get(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.with_conn(|conn| SqliteStore::new(conn).get(task_id))
    }

    fn insert(&self, record: NewTaskRecord) -> Result<Task> {
        self.with_conn(|conn| SqliteStore::new(conn).insert(record))
    }

    fn update(&self, task: &Task) -> Result<bool> {
        self.with_conn(|conn| SqliteStore::new(conn).update(task))
    }

    fn delete_subtree(&self, task_id: TaskId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let deleted = SqliteStore::new(&tx).delete_subtree(task_id)?;
            tx.commit()?;
            Ok(deleted)
        })
    }

    fn exists(&self, task_id: TaskId, owner: &str) -> Result<bool> {
        self.with_conn(|conn| SqliteStore::new(conn).exists(task_id, owner))
    }
}

impl TransactionalStore for Database {
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn TaskStore) -> Result<T>,
    {
        self.with_conn_mut(|conn| {
            // IMMEDIATE takes the write lock up front so the subtree read and the
            // write that depends on it see the same data.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let result = f(&SqliteStore::new(&tx))?;
            tx.commit()?;
            Ok(result)
        })
    }
}

impl Database {
    /// Count every task row (all owners).
    pub fn count_tasks(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}
