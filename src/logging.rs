//! Logging that reaches both tracing and a connected MCP client.
//!
//! Uses MCP `LoggingLevel` as the canonical level type so the client can
//! adjust verbosity through `logging/setLevel`.

use rmcp::{
    RoleServer,
    model::{LoggingLevel, LoggingMessageNotificationParam},
    service::Peer,
};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tracing::Level;

/// Minimum level a message needs to reach the client.
pub struct LogLevelFilter(AtomicU8);

impl LogLevelFilter {
    pub fn new(level: LoggingLevel) -> Self {
        Self(AtomicU8::new(level_rank(level)))
    }

    pub fn get(&self) -> LoggingLevel {
        rank_level(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: LoggingLevel) {
        self.0.store(level_rank(level), Ordering::Relaxed);
    }

    pub fn should_log(&self, level: LoggingLevel) -> bool {
        level_rank(level) >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new(LoggingLevel::Info)
    }
}

/// MCP levels from least to most severe; the index is the stored rank.
const LEVELS: [LoggingLevel; 8] = [
    LoggingLevel::Debug,
    LoggingLevel::Info,
    LoggingLevel::Notice,
    LoggingLevel::Warning,
    LoggingLevel::Error,
    LoggingLevel::Critical,
    LoggingLevel::Alert,
    LoggingLevel::Emergency,
];

fn level_rank(level: LoggingLevel) -> u8 {
    LEVELS.iter().position(|l| *l == level).unwrap_or(0) as u8
}

fn rank_level(rank: u8) -> LoggingLevel {
    LEVELS
        .get(rank as usize)
        .copied()
        .unwrap_or(LoggingLevel::Emergency)
}

/// Convert MCP LoggingLevel to tracing Level.
pub fn logging_level_to_tracing(level: LoggingLevel) -> Level {
    match level {
        LoggingLevel::Debug => Level::DEBUG,
        LoggingLevel::Info | LoggingLevel::Notice => Level::INFO,
        LoggingLevel::Warning => Level::WARN,
        LoggingLevel::Error
        | LoggingLevel::Critical
        | LoggingLevel::Alert
        | LoggingLevel::Emergency => Level::ERROR,
    }
}

/// Per-call logger for one tool invocation.
#[derive(Clone)]
pub struct Logger {
    peer: Option<Peer<RoleServer>>,
    level_filter: Arc<LogLevelFilter>,
    /// Logger name, e.g. `tool:done`.
    name: String,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            peer: None,
            level_filter: Arc::new(LogLevelFilter::default()),
            name: name.into(),
        }
    }

    pub fn with_peer(mut self, peer: Peer<RoleServer>) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn with_level_filter(mut self, filter: Arc<LogLevelFilter>) -> Self {
        self.level_filter = filter;
        self
    }

    /// Log to tracing and, when connected and above the filter, to the client.
    pub fn log(&self, level: LoggingLevel, message: &str, data: Option<Value>) {
        match logging_level_to_tracing(level) {
            Level::ERROR => tracing::error!(logger = %self.name, "{}", message),
            Level::WARN => tracing::warn!(logger = %self.name, "{}", message),
            Level::INFO => tracing::info!(logger = %self.name, "{}", message),
            _ => tracing::debug!(logger = %self.name, "{}", message),
        }

        if !self.level_filter.should_log(level) {
            return;
        }
        if let Some(ref peer) = self.peer {
            let param = LoggingMessageNotificationParam {
                level,
                logger: Some(self.name.clone()),
                data: data.unwrap_or_else(|| json!({ "message": message })),
            };
            let peer = peer.clone();
            tokio::spawn(async move {
                let _ = peer.notify_logging_message(param).await;
            });
        }
    }

    pub fn debug(&self, msg: &str) {
        self.log(LoggingLevel::Debug, msg, None);
    }

    pub fn info(&self, msg: &str) {
        self.log(LoggingLevel::Info, msg, None);
    }

    pub fn notice_with_data(&self, msg: &str, data: Value) {
        self.log(LoggingLevel::Notice, msg, Some(data));
    }

    pub fn warning(&self, msg: &str) {
        self.log(LoggingLevel::Warning, msg, None);
    }
}
