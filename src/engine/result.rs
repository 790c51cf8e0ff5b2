// ABOUTME: Task and workflow execution records
// ABOUTME: Defines statuses, task outputs and the per-run WorkflowExecution aggregate

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::error::TaskError;
use crate::parser::{TaskDefinition, WorkflowDefinition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutput {
    Process {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    Http {
        status: u16,
        body: String,
        headers: HashMap<String, String>,
    },
    Script {
        value: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecution {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Number of times the task body was invoked
    pub attempts: u32,
    pub output: Option<TaskOutput>,
    pub error: Option<String>,
    /// on_success / on_failure ids requested by this outcome
    #[serde(default)]
    pub triggered_callbacks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub tasks: IndexMap<String, TaskExecution>,
    pub error: Option<String>,
    pub environment: HashMap<String, String>,
}

impl TaskExecution {
    pub fn new(task: &TaskDefinition) -> Self {
        Self {
            id: task.id.clone(),
            name: task.display_name().to_string(),
            status: TaskStatus::Pending,
            started_at: None,
            completed_at: None,
            duration: Duration::ZERO,
            attempts: 0,
            output: None,
            error: None,
            triggered_callbacks: Vec::new(),
        }
    }

    pub fn mark_started(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, output: TaskOutput, duration: Duration) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.duration = duration;
        self.output = Some(output);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: TaskError, duration: Duration) {
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.duration = duration;
        self.output = error.output().cloned();
        self.error = Some(error.to_string());
    }

    /// Bypassed by a false condition; never started, zero duration
    pub fn mark_skipped(&mut self, reason: &str) {
        self.status = TaskStatus::Skipped;
        self.completed_at = Some(Utc::now());
        self.duration = Duration::ZERO;
        self.error = None;
        self.output = None;
        self.triggered_callbacks.clear();
        tracing::debug!("Task {} skipped: {}", self.id, reason);
    }

    /// Failed without ever running (dependency failure, blocked, workflow timeout)
    pub fn unexecuted(task: &TaskDefinition, error: TaskError) -> Self {
        let mut execution = Self::new(task);
        execution.mark_failed(error, Duration::ZERO);
        execution
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.status, TaskStatus::Pending | TaskStatus::Running)
    }
}

impl WorkflowExecution {
    pub fn new(workflow: &WorkflowDefinition) -> Self {
        let tasks = workflow
            .tasks
            .iter()
            .map(|task| (task.id.clone(), TaskExecution::new(task)))
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow.id(),
            workflow_name: workflow.name.clone(),
            status: WorkflowStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration: Duration::ZERO,
            tasks,
            error: None,
            environment: workflow.environment.clone(),
        }
    }

    pub fn mark_running(&mut self, task_id: &str) {
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.mark_started();
        }
    }

    pub fn record(&mut self, execution: TaskExecution) {
        self.tasks.insert(execution.id.clone(), execution);
    }

    /// Derive the terminal status once no further progress is possible
    pub fn finalize(&mut self, elapsed: Duration) {
        let failed = self.failed_count();
        self.status = if failed > 0 {
            WorkflowStatus::Failed
        } else {
            WorkflowStatus::Completed
        };
        self.error = (failed > 0).then(|| format!("{} task(s) failed", failed));
        self.completed_at = Some(Utc::now());
        self.duration = elapsed;
    }

    pub fn get_task(&self, task_id: &str) -> Option<&TaskExecution> {
        self.tasks.get(task_id)
    }

    pub fn failed_count(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.values().filter(|t| t.status == status).count()
    }

    pub fn failed_task_ids(&self) -> Vec<String> {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Failed)
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn is_successful(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Pending => write!(f, "pending"),
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Failed => write!(f, "failed"),
            WorkflowStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(WorkflowStatus::Pending),
            "running" => Ok(WorkflowStatus::Running),
            "completed" => Ok(WorkflowStatus::Completed),
            "failed" => Ok(WorkflowStatus::Failed),
            "cancelled" => Ok(WorkflowStatus::Cancelled),
            other => Err(format!("unknown workflow status '{}'", other)),
        }
    }
}
