// ABOUTME: Task executor running a single task definition to a terminal record
// ABOUTME: Applies the condition, the retry policy and a per-attempt timeout

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{error, info, instrument, warn};

use super::context::ExecutionContext;
use super::error::TaskError;
use super::result::{TaskExecution, TaskOutput};
use crate::parser::TaskDefinition;
use crate::script::ScriptEngine;
use crate::tasks::TaskRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSettings {
    #[serde(with = "humantime_serde", default = "default_task_timeout")]
    pub default_task_timeout: Duration,
}

fn default_task_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            default_task_timeout: default_task_timeout(),
        }
    }
}

pub struct TaskExecutor {
    registry: Arc<TaskRegistry>,
    script_engine: ScriptEngine,
    settings: ExecutorSettings,
}

impl TaskExecutor {
    pub fn new(registry: Arc<TaskRegistry>, settings: ExecutorSettings) -> Self {
        Self {
            registry,
            script_engine: ScriptEngine::new(),
            settings,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Run a task to completion. Every failure is captured in the returned record.
    #[instrument(skip(self, task, context), fields(task_id = %task.id, kind = %task.kind))]
    pub async fn execute(&self, task: &TaskDefinition, context: &ExecutionContext) -> TaskExecution {
        let context = context.for_task(task);
        let mut execution = TaskExecution::new(task);

        if let Some(ref condition) = task.condition {
            match self
                .script_engine
                .evaluate_condition(condition, &context.environment)
            {
                Ok(true) => {}
                Ok(false) => {
                    info!("Task {} condition not met, skipping", task.id);
                    execution.mark_skipped("condition evaluated to false");
                    return execution;
                }
                Err(e) => {
                    error!("Task {} condition could not be evaluated: {}", task.id, e);
                    execution.mark_failed(TaskError::Condition(e), Duration::ZERO);
                    return execution;
                }
            }
        }

        let limit = task.timeout.unwrap_or(self.settings.default_task_timeout);
        let context = context.with_timeout(limit);
        let max_attempts = task.attempts();
        let policy = task.retry.clone().unwrap_or_default();

        execution.mark_started();
        let start_time = Instant::now();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            execution.attempts = attempt;
            info!(
                "Executing task {} (attempt {}/{})",
                task.id, attempt, max_attempts
            );

            match self.run_attempt(task, &context, limit).await {
                Ok(output) => {
                    info!("Task {} completed successfully", task.id);
                    execution.mark_completed(output, start_time.elapsed());
                    return execution;
                }
                Err(e) => {
                    warn!("Task {} attempt {} failed: {}", task.id, attempt, e);
                    last_error = Some(e);

                    if attempt < max_attempts {
                        let delay = policy.delay_for(attempt);
                        info!("Retrying task {} in {:?}", task.id, delay);
                        sleep(delay).await;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| TaskError::failed("task made no attempts"));
        error!("Task {} failed: {}", task.id, error);
        execution.mark_failed(error, start_time.elapsed());
        execution
    }

    /// One bounded attempt. Dropping the inner future on timeout cancels the work.
    async fn run_attempt(
        &self,
        task: &TaskDefinition,
        context: &ExecutionContext,
        limit: Duration,
    ) -> Result<TaskOutput, TaskError> {
        match timeout(limit, self.registry.execute(task, context)).await {
            Ok(result) => result,
            Err(_) => Err(TaskError::Timeout {
                task_id: task.id.clone(),
                timeout: limit,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TaskStatus;
    use crate::parser::WorkflowDefinition;
    use crate::tasks::TaskSettings;

    fn executor() -> TaskExecutor {
        TaskExecutor::new(
            Arc::new(TaskRegistry::new(&TaskSettings::default())),
            ExecutorSettings::default(),
        )
    }

    fn parse(yaml: &str) -> WorkflowDefinition {
        WorkflowDefinition::from_yaml(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_false_condition_skips() {
        let workflow = parse(
            r#"
name: cond
environment:
  MODE: dev
tasks:
  - id: deploy
    kind: script
    script: "1"
    condition: 'env.MODE == "prod"'
"#,
        );
        let context = ExecutionContext::new(&workflow, "exec");
        let result = executor().execute(&workflow.tasks[0], &context).await;

        assert_eq!(result.status, TaskStatus::Skipped);
        assert_eq!(result.attempts, 0);
        assert_eq!(result.duration, Duration::ZERO);
        assert!(result.started_at.is_none());
    }

    #[tokio::test]
    async fn test_task_environment_feeds_condition() {
        let workflow = parse(
            r#"
name: cond
environment:
  MODE: dev
tasks:
  - id: deploy
    kind: script
    script: "40 + 2"
    condition: 'env.MODE == "prod"'
    environment:
      MODE: prod
"#,
        );
        let context = ExecutionContext::new(&workflow, "exec");
        let result = executor().execute(&workflow.tasks[0], &context).await;

        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(result.attempts, 1);
        assert_eq!(
            result.output,
            Some(TaskOutput::Script {
                value: serde_json::json!(42)
            })
        );
    }

    #[tokio::test]
    async fn test_broken_condition_fails_without_running() {
        let workflow = parse(
            r#"
name: cond
tasks:
  - id: deploy
    kind: script
    script: "1"
    condition: "1 + 1"
"#,
        );
        let context = ExecutionContext::new(&workflow, "exec");
        let result = executor().execute(&workflow.tasks[0], &context).await;

        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.attempts, 0);
        assert!(result
            .error
            .unwrap()
            .starts_with("condition evaluation failed"));
    }

    #[tokio::test]
    async fn test_process_failure_is_recorded() {
        let workflow = parse(
            r#"
name: fail
tasks:
  - id: broken
    kind: process
    command: "exit 7"
    retry:
      attempts: 2
      delay: 10ms
"#,
        );
        let context = ExecutionContext::new(&workflow, "exec");
        let result = executor().execute(&workflow.tasks[0], &context).await;

        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.error.as_deref(), Some("command exited with code 7"));
        assert!(matches!(
            result.output,
            Some(TaskOutput::Process { exit_code: 7, .. })
        ));
    }

    #[tokio::test]
    async fn test_runaway_script_times_out() {
        let workflow = parse(
            r#"
name: slow
tasks:
  - id: spin
    kind: script
    script: "loop { }"
    timeout: 100ms
"#,
        );
        let context = ExecutionContext::new(&workflow, "exec");
        let result = executor().execute(&workflow.tasks[0], &context).await;

        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(
            result.error.as_deref(),
            Some("task 'spin' timed out after 100ms")
        );
    }
}
