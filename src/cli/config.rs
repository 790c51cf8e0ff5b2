// ABOUTME: Configuration management for conductor application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::{ExecutorSettings, OrchestratorSettings};
use crate::monitor::DEFAULT_HISTORY_CAPACITY;
use crate::tasks::process::ProcessBackend;
use crate::tasks::TaskSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    #[serde(default)]
    pub executor: ExecutorSettings,

    #[serde(default)]
    pub tasks: TaskSettings,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };

        config.merge_env()?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local = [
            PathBuf::from("conductor.yaml"),
            PathBuf::from("conductor.yml"),
            PathBuf::from(".conductor.yaml"),
            PathBuf::from(".conductor.yml"),
        ];

        if let Some(path) = local.into_iter().find(|p| p.exists()) {
            return Some(path);
        }

        dirs::home_dir()
            .map(|home| home.join(".conductor").join("config.yaml"))
            .filter(|p| p.exists())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(max) = lookup("CONDUCTOR_MAX_PARALLEL") {
            self.orchestrator.max_parallel_tasks = max
                .parse()
                .with_context(|| format!("Invalid CONDUCTOR_MAX_PARALLEL '{}'", max))?;
        }

        if let Some(timeout) = lookup("CONDUCTOR_TASK_TIMEOUT") {
            self.executor.default_task_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid CONDUCTOR_TASK_TIMEOUT '{}'", timeout))?;
        }

        if let Some(timeout) = lookup("CONDUCTOR_NOTIFICATION_TIMEOUT") {
            self.orchestrator.notification_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid CONDUCTOR_NOTIFICATION_TIMEOUT '{}'", timeout))?;
        }

        if let Some(capacity) = lookup("CONDUCTOR_HISTORY_CAPACITY") {
            self.monitor.history_capacity = capacity
                .parse()
                .with_context(|| format!("Invalid CONDUCTOR_HISTORY_CAPACITY '{}'", capacity))?;
        }

        if let Some(relay) = lookup("CONDUCTOR_RELAY_URL") {
            self.tasks.process_backend = match self.tasks.process_backend {
                ProcessBackend::Relay { .. } => ProcessBackend::Relay { endpoint: relay },
                ProcessBackend::Local { .. } => ProcessBackend::Local {
                    relay_fallback: Some(relay),
                },
            };
        }

        if let Some(level) = lookup("CONDUCTOR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CONDUCTOR_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }
}
