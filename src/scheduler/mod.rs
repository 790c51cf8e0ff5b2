// ABOUTME: Workflow scheduler owning workflow jobs and named maintenance routines
// ABOUTME: Runs jobs on demand, through the trigger boundary, or on their cadence

pub mod cadence;
pub mod job;
pub mod routines;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, instrument, warn};

use crate::engine::{ExecutionError, WorkflowExecution, WorkflowOrchestrator};
use crate::monitor::WorkflowMonitor;
use crate::parser::{ValidationError, WorkflowDefinition};

pub use cadence::{Cadence, CadenceError};
pub use job::{JobKind, JobSummary, NamedRoutine, RoutineHandler, ScheduledJob};
pub use routines::builtin_routines;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job is disabled: {0}")]
    JobDisabled(String),

    #[error("Invalid cadence '{cadence}': {source}")]
    InvalidCadence {
        cadence: String,
        source: CadenceError,
    },

    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(#[from] ValidationError),

    #[error("Workflow execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Routine '{id}' failed: {message}")]
    Routine { id: String, message: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Outcome shape for external trigger callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronResponse {
    pub success: bool,
    pub message: String,
}

pub struct WorkflowScheduler {
    orchestrator: Arc<WorkflowOrchestrator>,
    monitor: Arc<WorkflowMonitor>,
    jobs: RwLock<IndexMap<String, ScheduledJob>>,
    routines: RwLock<IndexMap<String, NamedRoutine>>,
    tick_interval: Duration,
}

impl WorkflowScheduler {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator>, monitor: Arc<WorkflowMonitor>) -> Self {
        Self {
            orchestrator,
            monitor,
            jobs: RwLock::new(IndexMap::new()),
            routines: RwLock::new(IndexMap::new()),
            tick_interval: Duration::from_secs(30),
        }
    }

    pub fn with_routines(mut self, routines: Vec<NamedRoutine>) -> Self {
        let registry = self.routines.get_mut();
        for routine in routines {
            registry.insert(routine.id.clone(), routine);
        }
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn monitor(&self) -> &Arc<WorkflowMonitor> {
        &self.monitor
    }

    pub async fn register_workflow(
        &self,
        workflow: WorkflowDefinition,
        cadence: &str,
    ) -> Result<String> {
        let cadence = Cadence::parse(cadence).map_err(|source| SchedulerError::InvalidCadence {
            cadence: cadence.to_string(),
            source,
        })?;
        workflow.validate_structure()?;

        let id = format!("wf-{}", uuid::Uuid::new_v4());
        info!(
            "Registered workflow job {} for {} on '{}'",
            id, workflow.name, cadence
        );

        let job = ScheduledJob::new(id.clone(), workflow, cadence);
        self.jobs.write().await.insert(id.clone(), job);
        Ok(id)
    }

    pub async fn unregister_workflow(&self, job_id: &str) -> bool {
        let removed = self.jobs.write().await.shift_remove(job_id).is_some();
        if removed {
            info!("Unregistered workflow job {}", job_id);
        }
        removed
    }

    pub async fn enable_job(&self, job_id: &str) -> bool {
        self.set_enabled(job_id, true).await
    }

    pub async fn disable_job(&self, job_id: &str) -> bool {
        self.set_enabled(job_id, false).await
    }

    async fn set_enabled(&self, job_id: &str, enabled: bool) -> bool {
        let now = Utc::now();

        if let Some(job) = self.jobs.write().await.get_mut(job_id) {
            job.enabled = enabled;
            job.next_run = job.cadence.next_after(now);
            return true;
        }

        if let Some(routine) = self.routines.write().await.get_mut(job_id) {
            routine.enabled = enabled;
            routine.next_run = routine.cadence.next_after(now);
            return true;
        }

        false
    }

    /// Run a job by id. Workflow jobs return their execution; routines return `None`.
    #[instrument(skip(self))]
    pub async fn run_job(&self, job_id: &str) -> Result<Option<WorkflowExecution>> {
        let workflow = {
            let jobs = self.jobs.read().await;
            match jobs.get(job_id) {
                Some(job) if !job.enabled => {
                    return Err(SchedulerError::JobDisabled(job_id.to_string()))
                }
                Some(job) => Some(job.workflow.clone()),
                None => None,
            }
        };

        if let Some(workflow) = workflow {
            let outcome = self.orchestrator.execute(&workflow).await;
            let now = Utc::now();

            if let Ok(ref execution) = outcome {
                self.monitor.record_execution(execution).await;
            }
            if let Some(job) = self.jobs.write().await.get_mut(job_id) {
                job.record_run(now, outcome.is_ok());
            }

            return Ok(Some(outcome?));
        }

        let handler = {
            let routines = self.routines.read().await;
            match routines.get(job_id) {
                Some(routine) if !routine.enabled => {
                    return Err(SchedulerError::JobDisabled(job_id.to_string()))
                }
                Some(routine) => Arc::clone(&routine.handler),
                None => return Err(SchedulerError::JobNotFound(job_id.to_string())),
            }
        };

        let outcome = handler.run().await;
        if let Some(routine) = self.routines.write().await.get_mut(job_id) {
            routine.record_run(Utc::now(), outcome.is_ok());
        }

        let summary = outcome?;
        info!("Routine {} finished: {}", job_id, summary);
        Ok(None)
    }

    /// Trigger boundary: never fails, always answers with success and a message
    pub async fn handle_cron_request(&self, job_id: &str) -> CronResponse {
        match self.run_job(job_id).await {
            Ok(Some(execution)) => CronResponse {
                success: true,
                message: format!(
                    "Workflow '{}' finished with status {} (execution {}, {} task(s))",
                    execution.workflow_name,
                    execution.status,
                    execution.id,
                    execution.tasks.len()
                ),
            },
            Ok(None) => CronResponse {
                success: true,
                message: format!("Routine '{}' completed", job_id),
            },
            Err(e) => {
                warn!("Cron request for {} failed: {}", job_id, e);
                CronResponse {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    pub async fn list_jobs(&self) -> Vec<JobSummary> {
        let mut summaries: Vec<JobSummary> = self
            .jobs
            .read()
            .await
            .values()
            .map(ScheduledJob::summary)
            .collect();
        summaries.extend(self.routines.read().await.values().map(NamedRoutine::summary));
        summaries
    }

    /// Run every enabled job whose next run is at or before `now`
    pub async fn run_due_jobs(&self, now: DateTime<Utc>) -> Vec<(String, CronResponse)> {
        let mut due: Vec<String> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_due(now))
            .map(|job| job.id.clone())
            .collect();
        due.extend(
            self.routines
                .read()
                .await
                .values()
                .filter(|routine| routine.is_due(now))
                .map(|routine| routine.id.clone()),
        );

        let mut responses = Vec::with_capacity(due.len());
        for job_id in due {
            let response = self.handle_cron_request(&job_id).await;
            responses.push((job_id, response));
        }
        responses
    }

    /// Tick until the shutdown channel fires
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        info!(
            "Workflow scheduler started (tick interval: {:?})",
            self.tick_interval
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        let mut shutdown = shutdown;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for (job_id, response) in self.run_due_jobs(Utc::now()).await {
                        if response.success {
                            info!("Scheduled job {}: {}", job_id, response.message);
                        } else {
                            error!("Scheduled job {} failed: {}", job_id, response.message);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("Workflow scheduler shutting down");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for WorkflowScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowScheduler")
            .field("tick_interval", &self.tick_interval)
            .finish()
    }
}
