// ABOUTME: Core workflow definition structures and parsing functionality
// ABOUTME: Defines the WorkflowDefinition struct, triggers, notifications and structural checks

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use super::error::{ParserError, Result, ValidationError};
use super::task::{TaskDefinition, TaskKind};

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default, alias = "env")]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub notifications: Option<NotificationConfig>,
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TriggerConfig {
    #[default]
    Manual,
    Schedule {
        cadence: String,
    },
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub webhook: String,
    #[serde(default)]
    pub on: NotifyOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyOn {
    #[default]
    Failure,
    Success,
    Always,
}

impl WorkflowDefinition {
    /// Parse workflow from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ParserError::IoError)?;
        Self::from_yaml(&content)
    }

    /// Parse workflow from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let workflow: WorkflowDefinition =
            serde_yaml::from_str(content).map_err(ParserError::YamlError)?;

        workflow.validate_structure()?;

        Ok(workflow)
    }

    /// Convert workflow back to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ParserError::YamlError)
    }

    /// Stable identifier used in execution records
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Reject definitions the orchestrator cannot run at all.
    ///
    /// Unknown dependency ids and cycles are not structural: the orchestrator
    /// runs what it can and finalises the stranded tasks as blocked.
    pub fn validate_structure(&self) -> std::result::Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if self.tasks.is_empty() {
            return Err(ValidationError::EmptyWorkflow);
        }

        let mut seen = HashSet::new();
        for (index, task) in self.tasks.iter().enumerate() {
            if task.id.trim().is_empty() {
                return Err(ValidationError::EmptyTaskId { index });
            }
            if !seen.insert(task.id.as_str()) {
                return Err(ValidationError::DuplicateTask {
                    task: task.id.clone(),
                });
            }
            validate_task(task)?;
        }

        Ok(())
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn get_task(&self, task_id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn has_task(&self, task_id: &str) -> bool {
        self.get_task(task_id).is_some()
    }

    /// Get all tasks that depend on a specific task
    pub fn get_dependent_tasks(&self, task_id: &str) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|task| task.depends_on.iter().any(|d| d == task_id))
            .map(|task| task.id.clone())
            .collect()
    }

    pub fn merge_environment(&mut self, vars: HashMap<String, String>) {
        self.environment.extend(vars);
    }

    pub fn cadence(&self) -> Option<&str> {
        match &self.trigger {
            TriggerConfig::Schedule { cadence } => Some(cadence),
            _ => None,
        }
    }
}

fn validate_task(task: &TaskDefinition) -> std::result::Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidTaskConfig {
        task: task.id.clone(),
        reason: reason.to_string(),
    };

    match &task.kind {
        TaskKind::Process { command, .. } => {
            if command.trim().is_empty() {
                return Err(invalid("command cannot be empty"));
            }
        }
        TaskKind::Http { url, method, .. } => {
            if url::Url::parse(url).is_err() {
                return Err(invalid(&format!("invalid url '{}'", url)));
            }
            if reqwest::Method::from_bytes(method.to_uppercase().as_bytes()).is_err() {
                return Err(invalid(&format!("invalid HTTP method '{}'", method)));
            }
        }
        TaskKind::Script { script } => {
            if script.trim().is_empty() {
                return Err(invalid("script cannot be empty"));
            }
        }
    }

    if let Some(ref retry) = task.retry {
        if retry.attempts == 0 {
            return Err(invalid("retry attempts must be greater than 0"));
        }
    }

    if task.timeout == Some(Duration::ZERO) {
        return Err(invalid("timeout must be greater than 0"));
    }

    if let Some(ref condition) = task.condition {
        if condition.trim().is_empty() {
            return Err(invalid("condition cannot be empty"));
        }
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct WorkflowParser;

impl WorkflowParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition> {
        let content = fs::read_to_string(path.as_ref())
            .await
            .map_err(ParserError::IoError)?;
        self.parse_string(&content)
    }

    pub fn parse_string(&self, content: &str) -> Result<WorkflowDefinition> {
        WorkflowDefinition::from_yaml(content)
    }
}

impl Default for WorkflowParser {
    fn default() -> Self {
        Self::new()
    }
}
