// ABOUTME: Command implementations for the conductor CLI
// ABOUTME: Handles run, validate, init, jobs, trigger and serve commands

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::args::Args;
use super::config::Config;
use crate::engine::{
    Notifier, OrchestratorSettings, TaskExecutor, WorkflowOrchestrator, WorkflowStatus,
};
use crate::monitor::WorkflowMonitor;
use crate::output::{self, OutputFormat};
use crate::parser::WorkflowDefinition;
use crate::scheduler::{builtin_routines, WorkflowScheduler};
use crate::tasks::TaskRegistry;

/// Jobs served by `jobs`, `trigger` and `serve`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFile {
    #[serde(default)]
    pub workflows: Vec<PathBuf>,
    #[serde(default)]
    pub routines: RoutineToggles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineToggles {
    #[serde(default = "enabled")]
    pub health_check: bool,
    #[serde(default = "enabled")]
    pub metrics_snapshot: bool,
}

fn enabled() -> bool {
    true
}

impl Default for RoutineToggles {
    fn default() -> Self {
        Self {
            health_check: true,
            metrics_snapshot: true,
        }
    }
}

impl ScheduleFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schedule file {}", path.display()))?;
        let mut schedule: ScheduleFile = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid schedule file {}", path.display()))?;

        // Workflow paths are relative to the schedule file
        if let Some(base) = path.parent() {
            for workflow in &mut schedule.workflows {
                if workflow.is_relative() {
                    *workflow = base.join(&*workflow);
                }
            }
        }

        Ok(schedule)
    }

    fn routine_enabled(&self, id: &str) -> bool {
        match id {
            crate::scheduler::routines::HEALTH_CHECK_ID => self.routines.health_check,
            crate::scheduler::routines::METRICS_SNAPSHOT_ID => self.routines.metrics_snapshot,
            _ => true,
        }
    }
}

/// Wire registry, executor and orchestrator from configuration
pub fn build_orchestrator(config: &Config, max_parallel: Option<usize>) -> WorkflowOrchestrator {
    let registry = Arc::new(TaskRegistry::new(&config.tasks));
    let executor = TaskExecutor::new(registry, config.executor.clone());
    let settings = OrchestratorSettings {
        max_parallel_tasks: max_parallel.unwrap_or(config.orchestrator.max_parallel_tasks),
        ..config.orchestrator.clone()
    };
    let notifier = Notifier::default().with_timeout(settings.notification_timeout);

    WorkflowOrchestrator::new(executor, settings).with_notifier(notifier)
}

/// Build a scheduler holding every scheduled workflow and enabled routine
pub async fn build_scheduler(
    schedule_path: &Path,
    config: &Config,
) -> Result<WorkflowScheduler> {
    let schedule = ScheduleFile::from_file(schedule_path)?;
    let monitor = Arc::new(WorkflowMonitor::new(config.monitor.history_capacity));
    let orchestrator = Arc::new(build_orchestrator(config, None));

    let routines = builtin_routines(Arc::clone(&monitor))?
        .into_iter()
        .filter(|routine| schedule.routine_enabled(&routine.id))
        .collect();

    let scheduler = WorkflowScheduler::new(orchestrator, monitor).with_routines(routines);

    for path in &schedule.workflows {
        let workflow = WorkflowDefinition::from_file(path)
            .with_context(|| format!("Failed to load workflow {}", path.display()))?;

        let Some(cadence) = workflow.cadence().map(str::to_string) else {
            warn!(
                "Workflow '{}' ({}) has no schedule trigger; not registered",
                workflow.name,
                path.display()
            );
            continue;
        };

        scheduler
            .register_workflow(workflow, &cadence)
            .await
            .with_context(|| format!("Failed to register workflow {}", path.display()))?;
    }

    Ok(scheduler)
}

/// Execute a workflow command
pub async fn run_workflow(
    workflow_path: PathBuf,
    env: Vec<String>,
    max_parallel: Option<usize>,
    output: Option<PathBuf>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    info!("Starting workflow execution: {}", workflow_path.display());

    let variables = Args::parse_variables(&env)?;
    let mut workflow = WorkflowDefinition::from_file(&workflow_path)
        .map_err(|e| anyhow::anyhow!("Failed to parse workflow: {}", e))?;
    workflow.merge_environment(variables);
    info!("Loaded workflow: {} ({} tasks)", workflow.name, workflow.tasks.len());

    let orchestrator = build_orchestrator(config, max_parallel);
    let execution = orchestrator
        .execute(&workflow)
        .await
        .map_err(|e| anyhow::anyhow!("Workflow execution failed: {}", e))?;

    let rendered = output::render_execution(&execution, format)?;
    output::emit(&rendered, output.as_deref()).await?;

    match execution.status {
        WorkflowStatus::Completed => Ok(()),
        status => Err(anyhow::anyhow!(
            "Workflow '{}' finished with status {}: {}",
            execution.workflow_name,
            status,
            execution.failed_task_ids().join(", ")
        )),
    }
}

/// Validate a workflow file
pub async fn validate_workflow(workflow_path: PathBuf, config: &Config) -> Result<()> {
    info!("Validating workflow: {}", workflow_path.display());

    let workflow = WorkflowDefinition::from_file(&workflow_path)
        .map_err(|e| anyhow::anyhow!("Workflow validation failed: {}", e))?;

    let report = build_orchestrator(config, None).validate(&workflow);

    for warning in &report.warnings {
        println!("⚠ {}", warning);
    }

    if !report.is_valid {
        for error in &report.errors {
            println!("✗ {}", error);
        }
        return Err(anyhow::anyhow!(
            "Workflow '{}' has {} validation error(s)",
            workflow.name,
            report.errors.len()
        ));
    }

    println!("✓ Workflow '{}' is valid", workflow.name);
    println!("  Tasks: {}", workflow.tasks.len());
    if let Some(cadence) = workflow.cadence() {
        println!("  Schedule: {}", cadence);
    }

    Ok(())
}

/// Initialize a new workflow file
pub async fn init_workflow(name: String, output_dir: PathBuf) -> Result<PathBuf> {
    info!("Initializing workflow '{}' in {}", name, output_dir.display());

    tokio::fs::create_dir_all(&output_dir).await?;

    let workflow_file = output_dir.join(format!("{}.yaml", name));
    if workflow_file.exists() {
        return Err(anyhow::anyhow!(
            "Workflow file already exists: {}",
            workflow_file.display()
        ));
    }

    tokio::fs::write(&workflow_file, workflow_template(&name)).await?;
    println!("✓ Created {}", workflow_file.display());

    Ok(workflow_file)
}

/// List scheduled jobs
pub async fn list_jobs(schedule_path: PathBuf, format: OutputFormat, config: &Config) -> Result<()> {
    let scheduler = build_scheduler(&schedule_path, config).await?;
    let jobs = scheduler.list_jobs().await;
    let rendered = format.formatter().format_jobs(&jobs)?;
    output::emit(&rendered, None).await?;
    Ok(())
}

/// Run one job through the trigger boundary
pub async fn trigger_job(job: String, schedule_path: PathBuf, config: &Config) -> Result<()> {
    let scheduler = build_scheduler(&schedule_path, config).await?;

    // Workflow job ids are minted per load, so accept the workflow name as well
    let job_id = scheduler
        .list_jobs()
        .await
        .into_iter()
        .find(|summary| summary.id == job || summary.name == job)
        .map(|summary| summary.id)
        .unwrap_or(job);

    let response = scheduler.handle_cron_request(&job_id).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.success {
        Ok(())
    } else {
        Err(anyhow::anyhow!(response.message))
    }
}

/// Run the scheduler loop until Ctrl-C
pub async fn serve(schedule_path: PathBuf, tick: Option<Duration>, config: &Config) -> Result<()> {
    let mut scheduler = build_scheduler(&schedule_path, config).await?;
    if let Some(interval) = tick {
        scheduler = scheduler.with_tick_interval(interval);
    }
    let scheduler = Arc::new(scheduler);

    let jobs = scheduler.list_jobs().await;
    info!("Serving {} job(s) from {}", jobs.len(), schedule_path.display());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    let _ = shutdown_tx.send(true);
    handle.await.context("Scheduler task panicked")?;

    let report = scheduler.monitor().health_report().await;
    info!("Final health: {}", report.status);
    Ok(())
}

fn workflow_template(name: &str) -> String {
    format!(
        r#"name: {name}
description: A starter workflow
environment:
  STAGE: dev

tasks:
  - id: prepare
    kind: process
    command: echo "preparing $STAGE"

  - id: check
    kind: script
    depends_on: [prepare]
    script: |
      #{{ stage: env.STAGE, ok: true }}

  - id: ping
    kind: http
    depends_on: [prepare]
    condition: env.STAGE != "dev"
    url: https://example.com/health
    retry:
      attempts: 3
      delay: 2s
      backoff: exponential
    timeout: 30s
"#
    )
}
