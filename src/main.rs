//! Task Tree
//!
//! Per-user hierarchical to-do tasks, served over MCP stdio or driven
//! directly from the command line.

use anyhow::Result;
use clap::Parser;
use rmcp::{
    ErrorData, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParams, CallToolResult, Content, InitializeResult, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities,
    },
    service::RequestContext,
    transport::io::stdio,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::OpenOptions;
use std::sync::Arc;
use task_tree::cli::{Cli, Command};
use task_tree::config::Config;
use task_tree::db::Database;
use task_tree::engine::TaskEngine;
use task_tree::error::{TaskError, TaskResult};
use task_tree::format::{OutputFormat, format_tree_markdown};
use task_tree::logging::{LogLevelFilter, Logger};
use task_tree::seed::seed_demo;
use task_tree::tools::{ToolContext, ToolHandler};
use task_tree::types::{MarkDoneOutcome, TaskTree};
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

/// MCP server handler.
#[derive(Clone)]
struct TaskTreeServer {
    tool_handler: Arc<ToolHandler>,
    /// Atomic level filter for logging (client can adjust via logging/setLevel).
    level_filter: Arc<LogLevelFilter>,
}

const INSTRUCTIONS: &str = "\
Personal hierarchical to-do list. list_tasks shows your tasks as a tree; create(parent=...) nests tasks. \
A task can only be marked done once every task below it is done. Done tasks cannot be deleted.";

impl ServerHandler for TaskTreeServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: Default::default(),
            server_info: rmcp::model::Implementation {
                name: "task-tree".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                logging: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn set_level(
        &self,
        request: rmcp::model::SetLevelRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<(), ErrorData> {
        self.level_filter.set(request.level);
        tracing::info!(level = ?request.level, "Logging level updated via MCP");
        Ok(())
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.tool_handler.get_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let tool_name = request.name.to_string();
        let start = std::time::Instant::now();

        let logger = Logger::new(format!("tool:{}", tool_name))
            .with_peer(context.peer.clone())
            .with_level_filter(Arc::clone(&self.level_filter));
        let tool_ctx = ToolContext::new(logger);

        let args = Value::Object(request.arguments.unwrap_or_default());
        match self.tool_handler.call_tool(&tool_name, args, &tool_ctx).await {
            Ok(result) => {
                let elapsed = start.elapsed();
                debug!(
                    tool = %tool_name,
                    duration_ms = elapsed.as_millis() as u64,
                    "Tool call succeeded"
                );

                Ok(CallToolResult {
                    content: vec![Content::text(result.to_string())],
                    is_error: None,
                    meta: None,
                    structured_content: None,
                })
            }
            Err(e) => {
                let err = TaskError::from(e);
                warn!(
                    tool = %tool_name,
                    error_code = ?err.code,
                    error_message = %err.message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool call failed"
                );
                let error_json = serde_json::to_string(&err)
                    .unwrap_or_else(|_| json!({ "error": err.to_string() }).to_string());
                Ok(CallToolResult {
                    content: vec![Content::text(error_json)],
                    is_error: Some(true),
                    meta: None,
                    structured_content: None,
                })
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_env();
            config
        }
        None => Config::load_or_default(),
    };

    // CLI flags override config and environment
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(owner) = &cli.owner {
        config.server.default_owner = Some(owner.clone());
    }
    if let Some(format) = cli.format {
        config.server.default_format = format;
    }

    let command = cli.command.unwrap_or(Command::Serve);
    if let Err(err) = run(config, command).await {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
        );
        std::process::exit(1);
    }

    Ok(())
}

async fn run(config: Config, command: Command) -> TaskResult<()> {
    let owner = config
        .server
        .default_owner
        .clone()
        .filter(|o| !o.trim().is_empty())
        .ok_or_else(|| TaskError::missing_field("owner"))?;
    let format = config.server.default_format;

    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;
    let engine = TaskEngine::new(db).with_max_depth(config.engine.max_depth);

    match command {
        Command::Serve => run_server(config, engine, owner).await?,
        Command::List(args) => {
            let filter = args.to_filter()?;
            let forest = engine.list_tasks(&owner, &filter)?;
            print_forest(&forest, format)?;
        }
        Command::Show { id } => {
            let tree = engine.get_task_tree(&owner, id)?;
            print_forest(std::slice::from_ref(&tree), format)?;
        }
        Command::Create(args) => {
            let task = engine.create_task(&owner, args.to_new_task()?)?;
            print_json(&task)?;
        }
        Command::Update(args) => {
            let task = engine.get_task(&owner, args.id)?;
            let updated = engine.update_task(&task, args.to_patch()?)?;
            print_json(&updated)?;
        }
        Command::Done { id } => {
            let task = engine.get_task(&owner, id)?;
            let outcome = engine.mark_done(&task)?;
            print_json(&outcome)?;
            if let MarkDoneOutcome::IncompleteDescendants { .. } = outcome {
                eprintln!("{}", outcome.message());
                std::process::exit(2);
            }
        }
        Command::Delete { id } => {
            let task = engine.get_task(&owner, id)?;
            engine.delete_task(&task)?;
            print_json(&json!({ "success": true, "deleted": id }))?;
        }
        Command::Seed => {
            let created = seed_demo(&engine, &owner)?;
            info!(owner = %owner, count = created.len(), "Seeded demo tasks");
            print_json(&created)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> TaskResult<()> {
    let out = serde_json::to_string_pretty(value).map_err(TaskError::internal)?;
    println!("{}", out);
    Ok(())
}

fn print_forest(forest: &[TaskTree], format: OutputFormat) -> TaskResult<()> {
    match format {
        OutputFormat::Markdown => {
            print!("{}", format_tree_markdown(forest));
            Ok(())
        }
        OutputFormat::Json => print_json(&json!({ "tasks": forest })),
    }
}

/// Run the MCP server
async fn run_server(config: Config, engine: TaskEngine<Database>, owner: String) -> Result<()> {
    info!("Starting Task Tree MCP Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);
    info!(owner = %owner, max_depth = engine.max_depth(), "Serving tasks");

    let tool_handler = Arc::new(ToolHandler::new(
        Arc::new(engine),
        owner,
        config.server.default_format,
    ));
    let server = TaskTreeServer {
        tool_handler,
        level_filter: Arc::new(LogLevelFilter::default()),
    };

    info!("Server ready, listening on stdio");
    let transport = stdio();
    let service = server.serve(transport).await?;
    service.waiting().await?;

    Ok(())
}
