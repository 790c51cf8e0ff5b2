// ABOUTME: Workflow orchestrator driving tasks through dependency-ordered rounds
// ABOUTME: Runs ready tasks concurrently, cascades failures and finalises the execution record

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use super::context::ExecutionContext;
use super::dependency::{DependencyTracker, Readiness};
use super::error::{Result, TaskError};
use super::executor::TaskExecutor;
use super::notifier::Notifier;
use super::result::{TaskExecution, TaskStatus, WorkflowExecution};
use crate::parser::{
    TaskDefinition, ValidationError, ValidationReport, WorkflowDefinition, WorkflowValidator,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,
    /// Upper bound on a single webhook delivery
    #[serde(with = "humantime_serde", default = "default_notification_timeout")]
    pub notification_timeout: Duration,
}

fn default_max_parallel_tasks() -> usize {
    5
}

fn default_notification_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_parallel_tasks: default_max_parallel_tasks(),
            notification_timeout: default_notification_timeout(),
        }
    }
}

pub struct WorkflowOrchestrator {
    executor: TaskExecutor,
    settings: OrchestratorSettings,
    notifier: Option<Notifier>,
}

impl WorkflowOrchestrator {
    pub fn new(executor: TaskExecutor, settings: OrchestratorSettings) -> Self {
        Self {
            executor,
            settings,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Full pre-flight report: graph checks plus per-kind configuration checks
    pub fn validate(&self, workflow: &WorkflowDefinition) -> ValidationReport {
        let mut report = WorkflowValidator::new().validate(workflow);

        if workflow.validate_structure().is_err() {
            return report;
        }

        for task in &workflow.tasks {
            if let Err(e) = self.executor.registry().validate(task) {
                report.errors.push(ValidationError::InvalidTaskConfig {
                    task: task.id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        report.is_valid = report.errors.is_empty();
        report
    }

    /// Execute a workflow. Only structural problems are returned as errors;
    /// task failures are reported on the execution record.
    #[instrument(skip(self, workflow), fields(workflow_name = %workflow.name))]
    pub async fn execute(&self, workflow: &WorkflowDefinition) -> Result<WorkflowExecution> {
        workflow.validate_structure()?;

        let start_time = Instant::now();
        let mut execution = WorkflowExecution::new(workflow);
        let context = ExecutionContext::new(workflow, &execution.id);
        let mut tracker = DependencyTracker::new();
        let max_parallel = self.settings.max_parallel_tasks.max(1);

        info!(
            "Starting workflow execution: {} (execution_id: {})",
            workflow.name, execution.id
        );

        let mut round = 0;
        loop {
            let unresolved: Vec<&TaskDefinition> = workflow
                .tasks
                .iter()
                .filter(|t| !tracker.is_resolved(&t.id) && !tracker.is_running(&t.id))
                .collect();

            if unresolved.is_empty() {
                break;
            }

            if let Some(limit) = workflow.timeout {
                if start_time.elapsed() >= limit {
                    error!("Workflow {} exceeded its timeout of {:?}", workflow.name, limit);
                    for task in unresolved {
                        tracker.mark_failed(&task.id);
                        execution.record(TaskExecution::unexecuted(
                            task,
                            TaskError::WorkflowTimeout(limit),
                        ));
                    }
                    break;
                }
            }

            let mut runnable = Vec::new();
            let mut cascaded = false;
            for task in unresolved {
                match tracker.classify(task) {
                    Readiness::Runnable => runnable.push(task),
                    Readiness::Waiting => {}
                    Readiness::Cascade(dependency) => {
                        warn!(
                            "Task {} will not run: dependency {} failed",
                            task.id, dependency
                        );
                        tracker.mark_failed(&task.id);
                        execution.record(TaskExecution::unexecuted(
                            task,
                            TaskError::DependencyFailed { dependency },
                        ));
                        cascaded = true;
                    }
                }
            }

            if runnable.is_empty() {
                if cascaded {
                    continue;
                }
                self.finalize_blocked(workflow, &mut tracker, &mut execution);
                break;
            }

            round += 1;
            runnable.truncate(max_parallel);
            info!(
                "Executing round {} with {} tasks: {:?}",
                round,
                runnable.len(),
                runnable.iter().map(|t| t.id.as_str()).collect::<Vec<_>>()
            );

            for task in &runnable {
                tracker.mark_running(&task.id);
                execution.mark_running(&task.id);
            }

            let outcomes = join_all(
                runnable
                    .iter()
                    .map(|task| self.executor.execute(task, &context)),
            )
            .await;

            for (task, mut outcome) in runnable.into_iter().zip(outcomes) {
                let callbacks: &[String] = match outcome.status {
                    TaskStatus::Failed => {
                        tracker.mark_failed(&task.id);
                        &task.on_failure
                    }
                    TaskStatus::Skipped => {
                        tracker.mark_completed(&task.id);
                        &[]
                    }
                    _ => {
                        tracker.mark_completed(&task.id);
                        &task.on_success
                    }
                };

                if !callbacks.is_empty() {
                    info!(
                        "Task {} ({}) requested callbacks {:?}; recorded only",
                        task.id, outcome.status, callbacks
                    );
                    outcome.triggered_callbacks = callbacks.to_vec();
                }

                execution.record(outcome);
            }
        }

        execution.finalize(start_time.elapsed());

        info!(
            "Workflow execution completed in {:?} with status: {}",
            execution.duration, execution.status
        );

        if let Some(ref notifier) = self.notifier {
            notifier.notify(workflow, &execution).await;
        }

        Ok(execution)
    }

    /// No task can make progress: cycles or dependency ids that do not exist
    fn finalize_blocked(
        &self,
        workflow: &WorkflowDefinition,
        tracker: &mut DependencyTracker,
        execution: &mut WorkflowExecution,
    ) {
        let stuck: Vec<&TaskDefinition> = workflow
            .tasks
            .iter()
            .filter(|t| !tracker.is_resolved(&t.id))
            .collect();

        warn!(
            "Workflow {} cannot make progress; {} task(s) blocked: {:?}",
            workflow.name,
            stuck.len(),
            stuck.iter().map(|t| t.id.as_str()).collect::<Vec<_>>()
        );

        for task in stuck {
            let pending = tracker.pending_dependencies(task);
            tracker.mark_failed(&task.id);
            execution.record(TaskExecution::unexecuted(
                task,
                TaskError::Blocked { pending },
            ));
        }
    }
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("settings", &self.settings)
            .finish()
    }
}
