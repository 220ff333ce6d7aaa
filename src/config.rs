//! Configuration loading and management.

use crate::format::OutputFormat;
use crate::hierarchy::DEFAULT_MAX_DEPTH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local configuration file.
pub const PROJECT_CONFIG_PATH: &str = ".task-tree/config.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Storage and default-caller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Owner used when a command does not name one.
    #[serde(default)]
    pub default_owner: Option<String>,

    /// Output format for CLI commands and tool results.
    #[serde(default)]
    pub default_format: OutputFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_owner: None,
            default_format: OutputFormat::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".task-tree/tasks.db")
}

/// Tree traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deepest level a traversal may descend before failing.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// User-level configuration file, e.g. `~/.config/task-tree/config.yaml`.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("task-tree").join("config.yaml"))
    }

    /// Load configuration from default locations or return defaults.
    ///
    /// Environment overrides apply on top of whichever source was found.
    pub fn load_or_default() -> Self {
        let mut config = if let Ok(config) = Self::load(PROJECT_CONFIG_PATH) {
            config
        } else if let Some(config) = Self::user_config_path().and_then(|p| Self::load(p).ok()) {
            config
        } else {
            Self::default()
        };
        config.apply_env();
        config
    }

    /// Apply `TASK_TREE_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(db_path) = std::env::var("TASK_TREE_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(owner) = std::env::var("TASK_TREE_OWNER")
            && !owner.trim().is_empty()
        {
            self.server.default_owner = Some(owner);
        }

        if let Ok(depth) = std::env::var("TASK_TREE_MAX_DEPTH")
            && let Ok(depth) = depth.parse()
        {
            self.engine.max_depth = depth;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
