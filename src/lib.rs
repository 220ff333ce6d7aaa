//! Task Tree Library
//!
//! Per-user hierarchical to-do tasks: a filtered tree view, a completion rule
//! that requires every descendant to be done, and cascading deletion of open
//! subtrees. Exposed through a CLI and an MCP stdio server.

pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod filter;
pub mod format;
pub mod hierarchy;
pub mod logging;
pub mod seed;
pub mod store;
pub mod tools;
pub mod types;
