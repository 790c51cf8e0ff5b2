// ABOUTME: Error types for task execution engine operations
// ABOUTME: Separates structural workflow errors from per-task failure causes

use std::time::Duration;
use thiserror::Error;

use super::result::TaskOutput;
use crate::parser::ValidationError;
use crate::script::ScriptError;

/// Errors that abort a workflow before any task runs
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Invalid workflow definition: {0}")]
    Structural(#[from] ValidationError),
}

/// Why a single task ended up failed. Stored as text on the execution record.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("{message}")]
    Failed {
        message: String,
        output: Option<TaskOutput>,
    },

    #[error("task '{task_id}' timed out after {timeout:?}")]
    Timeout { task_id: String, timeout: Duration },

    #[error("dependency '{dependency}' failed")]
    DependencyFailed { dependency: String },

    #[error("blocked: waiting on unresolved dependencies {pending:?}")]
    Blocked { pending: Vec<String> },

    #[error("workflow timed out after {0:?}")]
    WorkflowTimeout(Duration),

    #[error("condition evaluation failed: {0}")]
    Condition(#[from] ScriptError),

    #[error("Task kind not supported: {kind}")]
    KindNotSupported { kind: String },

    #[error("Invalid task configuration: {0}")]
    InvalidConfig(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed {
            message: message.into(),
            output: None,
        }
    }

    pub fn with_output(message: impl Into<String>, output: TaskOutput) -> Self {
        TaskError::Failed {
            message: message.into(),
            output: Some(output),
        }
    }

    /// Output captured before the failure, if any
    pub fn output(&self) -> Option<&TaskOutput> {
        match self {
            TaskError::Failed { output, .. } => output.as_ref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let timeout = TaskError::Timeout {
            task_id: "fetch".to_string(),
            timeout: Duration::from_millis(50),
        };
        assert_eq!(timeout.to_string(), "task 'fetch' timed out after 50ms");
        assert!(timeout.is_timeout());

        let cascade = TaskError::DependencyFailed {
            dependency: "build".to_string(),
        };
        assert_eq!(cascade.to_string(), "dependency 'build' failed");
        assert!(cascade.output().is_none());
    }

    #[test]
    fn test_failure_keeps_output() {
        let error = TaskError::with_output(
            "command exited with code 2",
            TaskOutput::Process {
                stdout: String::new(),
                stderr: "boom".to_string(),
                exit_code: 2,
            },
        );
        assert!(matches!(
            error.output(),
            Some(TaskOutput::Process { exit_code: 2, .. })
        ));
    }
}
