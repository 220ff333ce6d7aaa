//! Integration tests for the database layer.
//!
//! These tests exercise the store contract against an in-memory SQLite database.

use task_tree::db::Database;
use task_tree::filter::{FilterSpec, Predicate, SortField, SortKey};
use task_tree::store::{TaskStore, TransactionalStore};
use task_tree::types::{NewTaskRecord, Priority, TaskStatus};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn record(owner: &str, title: &str, parent_id: Option<i64>) -> NewTaskRecord {
    NewTaskRecord {
        owner_id: owner.to_string(),
        parent_id,
        title: title.to_string(),
        description: String::new(),
        priority: Priority::Medium,
    }
}

mod insert_tests {
    use super::*;

    #[test]
    fn insert_assigns_id_and_timestamps() {
        let db = setup_db();

        let task = db.insert(record("alice", "Buy milk", None)).expect("insert");

        assert!(task.id > 0);
        assert_eq!(task.status, TaskStatus::Open);
        assert!(task.completed_at.is_none());
        assert!(task.created_at > 0);
        assert_eq!(task.created_at, task.updated_at);

        let fetched = db.get(task.id).expect("get").expect("task exists");
        assert_eq!(fetched, task);
    }

    #[test]
    fn get_missing_returns_none() {
        let db = setup_db();
        assert!(db.get(9999).expect("get").is_none());
    }

    #[test]
    fn parent_must_exist() {
        let db = setup_db();
        let result = db.insert(record("alice", "Orphan", Some(42)));
        assert!(result.is_err(), "foreign key should reject unknown parent");
    }

    #[test]
    fn exists_checks_owner() {
        let db = setup_db();
        let task = db.insert(record("alice", "Mine", None)).unwrap();

        assert!(db.exists(task.id, "alice").unwrap());
        assert!(!db.exists(task.id, "bob").unwrap());
        assert!(!db.exists(task.id + 1, "alice").unwrap());
    }

    #[test]
    fn schema_rejects_done_without_completion_time() {
        let db = setup_db();
        let mut task = db.insert(record("alice", "Inconsistent", None)).unwrap();
        task.status = TaskStatus::Done;
        task.completed_at = None;

        assert!(db.update(&task).is_err());
    }
}

mod query_tests {
    use super::*;

    #[test]
    fn roots_are_scoped_to_owner_in_creation_order() {
        let db = setup_db();
        let a = db.insert(record("alice", "A", None)).unwrap();
        let _b = db.insert(record("bob", "B", None)).unwrap();
        let c = db.insert(record("alice", "C", None)).unwrap();
        let _child = db.insert(record("alice", "A.1", Some(a.id))).unwrap();

        let roots = db.find_roots("alice", &Predicate::default(), None).unwrap();
        let ids: Vec<_> = roots.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn roots_apply_predicate_and_comparator() {
        let db = setup_db();
        let mut low = record("alice", "Low", None);
        low.priority = Priority::Low;
        let low = db.insert(low).unwrap();
        let mut high = record("alice", "High", None);
        high.priority = Priority::High;
        let high = db.insert(high).unwrap();
        let medium = db.insert(record("alice", "Medium", None)).unwrap();

        let filter = FilterSpec::new().sorted_by(SortKey::desc(SortField::Priority), None);
        let comparator = filter.comparator();
        let roots = db
            .find_roots("alice", &filter.predicate(), comparator.as_ref())
            .unwrap();
        let ids: Vec<_> = roots.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![high.id, medium.id, low.id]);

        let only_low = FilterSpec::new().with_priority(Priority::Low).predicate();
        let roots = db.find_roots("alice", &only_low, None).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, low.id);
    }

    #[test]
    fn children_filtered_and_unfiltered() {
        let db = setup_db();
        let parent = db.insert(record("alice", "Parent", None)).unwrap();
        let open = db.insert(record("alice", "Open child", Some(parent.id))).unwrap();
        let mut done = db.insert(record("alice", "Done child", Some(parent.id))).unwrap();
        done.status = TaskStatus::Done;
        done.completed_at = Some(done.created_at);
        assert!(db.update(&done).unwrap());

        let open_only = FilterSpec::new().with_status(TaskStatus::Open).predicate();
        let filtered = db.find_children(parent.id, &open_only).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, open.id);

        let all = db.find_children_unfiltered(parent.id).unwrap();
        let ids: Vec<_> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![open.id, done.id]);
    }

    #[test]
    fn search_matches_description_case_insensitively() {
        let db = setup_db();
        let mut with_desc = record("alice", "Errand", None);
        with_desc.description = "Pick up the PARCEL".to_string();
        let with_desc = db.insert(with_desc).unwrap();
        db.insert(record("alice", "Something else", None)).unwrap();

        let predicate = FilterSpec::new().with_search("parcel").predicate();
        let roots = db.find_roots("alice", &predicate, None).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, with_desc.id);
    }
}

mod delete_tests {
    use super::*;

    #[test]
    fn delete_subtree_removes_all_descendants() {
        let db = setup_db();
        let root = db.insert(record("alice", "Root", None)).unwrap();
        let child = db.insert(record("alice", "Child", Some(root.id))).unwrap();
        let grandchild = db.insert(record("alice", "Grandchild", Some(child.id))).unwrap();
        let other = db.insert(record("alice", "Other", None)).unwrap();

        assert!(db.delete_subtree(root.id).unwrap());

        assert!(db.get(root.id).unwrap().is_none());
        assert!(db.get(child.id).unwrap().is_none());
        assert!(db.get(grandchild.id).unwrap().is_none());
        assert!(db.get(other.id).unwrap().is_some());
        assert_eq!(db.count_tasks().unwrap(), 1);
    }

    #[test]
    fn delete_missing_returns_false() {
        let db = setup_db();
        assert!(!db.delete_subtree(123).unwrap());
    }
}

mod transaction_tests {
    use super::*;

    #[test]
    fn atomically_commits_on_success() {
        let db = setup_db();

        let id = db
            .atomically(|store| {
                let parent = store.insert(record("alice", "Parent", None))?;
                store.insert(record("alice", "Child", Some(parent.id)))?;
                Ok(parent.id)
            })
            .expect("transaction");

        assert_eq!(db.find_children_unfiltered(id).unwrap().len(), 1);
        assert_eq!(db.count_tasks().unwrap(), 2);
    }

    #[test]
    fn atomically_rolls_back_on_error() {
        let db = setup_db();

        let result: anyhow::Result<()> = db.atomically(|store| {
            store.insert(record("alice", "Doomed", None))?;
            anyhow::bail!("abort");
        });

        assert!(result.is_err());
        assert_eq!(db.count_tasks().unwrap(), 0);
    }

    #[test]
    fn on_disk_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");

        let id = {
            let db = Database::open(&path).expect("open");
            db.insert(record("alice", "Durable", None)).unwrap().id
        };

        let db = Database::open(&path).expect("reopen");
        let task = db.get(id).unwrap().expect("task survives reopen");
        assert_eq!(task.title, "Durable");
    }
}
