//! Per-request context passed to tool functions.

use crate::logging::Logger;

/// Per-request context passed to all tools.
#[derive(Clone)]
pub struct ToolContext {
    /// Logger bound to this call; reaches tracing and the MCP client.
    pub logger: Logger,
}

impl ToolContext {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Context with a detached logger, for calls made outside a client session.
    pub fn detached(tool_name: &str) -> Self {
        Self::new(Logger::new(format!("tool:{}", tool_name)))
    }
}
