//! Tests for the MCP tool surface.

use serde_json::{Value, json};
use std::sync::Arc;
use task_tree::db::Database;
use task_tree::engine::TaskEngine;
use task_tree::error::{ErrorCode, TaskError};
use task_tree::format::OutputFormat;
use task_tree::tools::{ToolContext, ToolHandler};

fn setup_handler(owner: &str) -> ToolHandler {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    ToolHandler::new(Arc::new(TaskEngine::new(db)), owner, OutputFormat::Json)
}

async fn call(handler: &ToolHandler, name: &str, args: Value) -> anyhow::Result<Value> {
    handler
        .call_tool(name, args, &ToolContext::detached(name))
        .await
}

async fn call_err(handler: &ToolHandler, name: &str, args: Value) -> TaskError {
    let err = call(handler, name, args)
        .await
        .expect_err("tool call should fail");
    TaskError::from(err)
}

async fn create(handler: &ToolHandler, args: Value) -> i64 {
    let result = call(handler, "create", args).await.expect("create");
    result["task_id"].as_i64().expect("task_id")
}

#[tokio::test]
async fn lists_every_tool() {
    let handler = setup_handler("alice");
    let names: Vec<String> = handler
        .get_tools()
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();

    for expected in ["list_tasks", "get", "create", "update", "done", "delete"] {
        assert!(names.iter().any(|n| n == expected), "missing tool {}", expected);
    }
}

#[tokio::test]
async fn create_and_list_nested_tasks() {
    let handler = setup_handler("alice");
    let root = create(&handler, json!({ "title": "Plan trip", "priority": "high" })).await;
    let child = create(&handler, json!({ "title": "Book hotel", "parent": root })).await;

    let result = call(&handler, "list_tasks", json!({})).await.unwrap();
    let tasks = result["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], root);
    assert_eq!(tasks[0]["priority"], "high");
    assert_eq!(tasks[0]["children"][0]["id"], child);
    assert_eq!(tasks[0]["children"][0]["priority"], "medium");
}

#[tokio::test]
async fn list_tasks_accepts_filter_and_sort_shape() {
    let handler = setup_handler("alice");
    let low = create(&handler, json!({ "title": "Low", "priority": "low" })).await;
    let high = create(&handler, json!({ "title": "High", "priority": 3 })).await;

    let result = call(
        &handler,
        "list_tasks",
        json!({
            "status": "todo",
            "sort": { "field1": "priority", "order1": "desc", "field2": "created_at" }
        }),
    )
    .await
    .unwrap();
    let ids: Vec<i64> = result["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![high, low]);

    let err = call_err(
        &handler,
        "list_tasks",
        json!({ "sort": { "field1": "title" } }),
    )
    .await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
}

#[tokio::test]
async fn done_reports_refusal_as_outcome() {
    let handler = setup_handler("alice");
    let parent = create(&handler, json!({ "title": "Parent" })).await;
    let child = create(&handler, json!({ "title": "Child", "parent": parent })).await;

    let refused = call(&handler, "done", json!({ "task": parent })).await.unwrap();
    assert_eq!(refused["outcome"], "incomplete_descendants");
    assert_eq!(refused["success"], false);
    assert_eq!(refused["blocking_task"], child);

    let done = call(&handler, "done", json!({ "task": child })).await.unwrap();
    assert_eq!(done["outcome"], "completed");
    assert_eq!(done["task"]["status"], "done");

    let done = call(&handler, "done", json!({ "task": parent.to_string() })).await.unwrap();
    assert_eq!(done["success"], true);
}

#[tokio::test]
async fn get_with_children_returns_unfiltered_subtree() {
    let handler = setup_handler("alice");
    let root = create(&handler, json!({ "title": "Root" })).await;
    let child = create(&handler, json!({ "title": "Child", "parent": root })).await;
    call(&handler, "done", json!({ "task": child })).await.unwrap();

    let tree = call(&handler, "get", json!({ "task": root, "children": true }))
        .await
        .unwrap();
    assert_eq!(tree["children"][0]["status"], "done");

    let md = call(&handler, "get", json!({ "task": root, "format": "markdown" }))
        .await
        .unwrap();
    assert_eq!(md["format"], "markdown");
    assert!(md["content"].as_str().unwrap().contains("Root"));
}

#[tokio::test]
async fn update_detaches_with_null_parent() {
    let handler = setup_handler("alice");
    let root = create(&handler, json!({ "title": "Root" })).await;
    let child = create(&handler, json!({ "title": "Child", "parent": root })).await;

    let updated = call(
        &handler,
        "update",
        json!({ "task": child, "parent": null, "priority": "critical" }),
    )
    .await
    .unwrap();
    assert!(updated["parent_id"].is_null());
    assert_eq!(updated["priority"], "critical");

    let err = call_err(&handler, "update", json!({ "task": child, "status": "blocked" })).await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
}

#[tokio::test]
async fn delete_refuses_done_tasks() {
    let handler = setup_handler("alice");
    let task = create(&handler, json!({ "title": "Finished" })).await;
    call(&handler, "done", json!({ "task": task })).await.unwrap();

    let err = call_err(&handler, "delete", json!({ "task": task })).await;
    assert_eq!(err.code, ErrorCode::TaskCompleted);

    let open = create(&handler, json!({ "title": "Scratch" })).await;
    let result = call(&handler, "delete", json!({ "task": open })).await.unwrap();
    assert_eq!(result["deleted"], open);
}

#[tokio::test]
async fn other_owners_tasks_are_invisible() {
    let db = Database::open_in_memory().unwrap();
    let engine = Arc::new(TaskEngine::new(db));
    let alice = ToolHandler::new(Arc::clone(&engine), "alice", OutputFormat::Json);
    let bob = ToolHandler::new(engine, "bob", OutputFormat::Json);

    let task = create(&alice, json!({ "title": "Private" })).await;

    let err = call_err(&bob, "get", json!({ "task": task })).await;
    assert_eq!(err.code, ErrorCode::TaskNotFound);

    let err = call_err(&bob, "create", json!({ "title": "Sneaky", "parent": task })).await;
    assert_eq!(err.code, ErrorCode::ParentNotFound);

    let listed = call(&bob, "list_tasks", json!({})).await.unwrap();
    assert!(listed["tasks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn argument_errors_are_structured() {
    let handler = setup_handler("alice");

    let err = call_err(&handler, "create", json!({})).await;
    assert_eq!(err.code, ErrorCode::MissingRequiredField);
    assert_eq!(err.field.as_deref(), Some("title"));

    let err = call_err(&handler, "done", json!({ "task": "seven" })).await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);

    let err = call_err(&handler, "nope", json!({})).await;
    assert_eq!(err.code, ErrorCode::UnknownTool);
}

#[tokio::test]
async fn markdown_default_format_applies_to_listing() {
    let db = Database::open_in_memory().unwrap();
    let handler = ToolHandler::new(Arc::new(TaskEngine::new(db)), "alice", OutputFormat::Markdown);
    create(&handler, json!({ "title": "Read book" })).await;

    let result = call(&handler, "list_tasks", json!({})).await.unwrap();
    let content = result["content"].as_str().unwrap();
    assert!(content.starts_with("# Tasks (1)"));
    assert!(content.contains("- [ ] Read book"));
}

#[tokio::test]
async fn wrongly_typed_strings_are_rejected_not_ignored() {
    let handler = setup_handler("alice");
    let task = create(&handler, json!({ "title": "Original" })).await;

    let err = call_err(
        &handler,
        "update",
        json!({ "task": task, "title": 42, "status": 1, "description": false }),
    )
    .await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);

    let err = call_err(&handler, "update", json!({ "task": task, "status": true })).await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    assert_eq!(err.field.as_deref(), Some("status"));

    let unchanged = call(&handler, "get", json!({ "task": task })).await.unwrap();
    assert_eq!(unchanged["title"], "Original");
    assert_eq!(unchanged["status"], "open");
    assert_eq!(unchanged["description"], "");

    let err = call_err(&handler, "create", json!({ "title": 5 })).await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    assert_eq!(err.field.as_deref(), Some("title"));

    let err = call_err(&handler, "create", json!({ "title": "X", "description": 7 })).await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    assert_eq!(err.field.as_deref(), Some("description"));

    let listed = call(&handler, "list_tasks", json!({})).await.unwrap();
    assert_eq!(listed["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn priority_schema_accepts_names_and_numbers_everywhere() {
    let handler = setup_handler("alice");
    for tool in handler.get_tools() {
        let name = tool.name.to_string();
        if !["list_tasks", "create", "update"].contains(&name.as_str()) {
            continue;
        }
        let priority = &tool.input_schema["properties"]["priority"];
        let variants = priority["oneOf"].as_array().expect("oneOf priority");
        assert_eq!(variants[0]["type"], "string");
        assert_eq!(variants[1]["type"], "integer");
        assert_eq!(variants[1]["maximum"], 5);
    }

    let task = create(&handler, json!({ "title": "Numbered", "priority": 4 })).await;
    let updated = call(&handler, "update", json!({ "task": task, "priority": 1 }))
        .await
        .unwrap();
    assert_eq!(updated["priority"], "low");
}
