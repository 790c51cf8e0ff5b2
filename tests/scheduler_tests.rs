// ABOUTME: Integration tests for the workflow scheduler
// ABOUTME: Covers job registration, enablement, the trigger boundary, routines and due-job sweeps

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use conductor::engine::WorkflowStatus;
use conductor::monitor::WorkflowMonitor;
use conductor::scheduler::{
    builtin_routines, Cadence, JobKind, NamedRoutine, RoutineHandler, SchedulerError,
    WorkflowScheduler,
};

mod common;
use common::{orchestrator_with, Behavior, RecordingTask, TestWorkflowBuilder};

fn scheduler_with(fake: &RecordingTask) -> WorkflowScheduler {
    let monitor = Arc::new(WorkflowMonitor::new(10));
    let orchestrator = Arc::new(orchestrator_with(fake, 5));
    WorkflowScheduler::new(orchestrator, monitor)
}

struct CountingRoutine {
    calls: Arc<AtomicU32>,
    fail: bool,
}

#[async_trait]
impl RoutineHandler for CountingRoutine {
    async fn run(&self) -> Result<String, SchedulerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SchedulerError::Routine {
                id: "counting".to_string(),
                message: "backend unavailable".to_string(),
            });
        }
        Ok("counted".to_string())
    }
}

fn counting_routine(id: &str, fail: bool) -> (NamedRoutine, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let routine = NamedRoutine::new(
        id,
        format!("{} routine", id),
        Cadence::parse("0 0 1 1 *").unwrap(),
        Arc::new(CountingRoutine {
            calls: Arc::clone(&calls),
            fail,
        }),
    );
    (routine, calls)
}

#[tokio::test]
async fn test_register_and_run_workflow_job() {
    let fake = RecordingTask::new();
    let scheduler = scheduler_with(&fake);

    let workflow = TestWorkflowBuilder::new("nightly")
        .add_task("a", &[])
        .add_task("b", &["a"])
        .build();
    let job_id = scheduler
        .register_workflow(workflow, "0 2 * * *")
        .await
        .unwrap();
    assert!(job_id.starts_with("wf-"));

    let before = scheduler.list_jobs().await;
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].kind, JobKind::Workflow);
    assert_eq!(before[0].cadence, "0 2 * * *");
    assert_eq!(before[0].run_count, 0);
    assert!(before[0].next_run.is_some());

    let execution = scheduler.run_job(&job_id).await.unwrap().unwrap();
    assert_eq!(execution.status, WorkflowStatus::Completed);
    assert_eq!(fake.call_order(), vec!["a", "b"]);

    let after = scheduler.list_jobs().await;
    assert_eq!(after[0].run_count, 1);
    assert!(after[0].last_run.is_some());

    let metrics = scheduler.monitor().workflow_metrics().await;
    assert_eq!(metrics.total_executions, 1);
    assert_eq!(metrics.successful_executions, 1);
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let scheduler = scheduler_with(&RecordingTask::new());

    let workflow = TestWorkflowBuilder::new("bad_cadence")
        .add_task("a", &[])
        .build();
    let result = scheduler.register_workflow(workflow, "61 * * * *").await;
    assert!(matches!(result, Err(SchedulerError::InvalidCadence { .. })));

    let dupes = TestWorkflowBuilder::new("dupes")
        .add_task("a", &[])
        .add_task("a", &[])
        .build();
    let result = scheduler.register_workflow(dupes, "* * * * *").await;
    assert!(matches!(result, Err(SchedulerError::InvalidWorkflow(_))));

    assert!(scheduler.list_jobs().await.is_empty());
}

#[tokio::test]
async fn test_unknown_and_disabled_jobs() {
    let scheduler = scheduler_with(&RecordingTask::new());

    let result = scheduler.run_job("wf-missing").await;
    assert!(matches!(result, Err(SchedulerError::JobNotFound(_))));

    let response = scheduler.handle_cron_request("wf-missing").await;
    assert!(!response.success);
    assert_eq!(response.message, "Job not found: wf-missing");

    let job_id = scheduler
        .register_workflow(
            TestWorkflowBuilder::new("toggled").add_task("a", &[]).build(),
            "*/15 * * * *",
        )
        .await
        .unwrap();

    assert!(scheduler.disable_job(&job_id).await);
    assert!(matches!(
        scheduler.run_job(&job_id).await,
        Err(SchedulerError::JobDisabled(_))
    ));
    assert!(!scheduler.list_jobs().await[0].enabled);

    assert!(scheduler.enable_job(&job_id).await);
    assert!(scheduler.run_job(&job_id).await.is_ok());

    assert!(!scheduler.enable_job("wf-missing").await);
    assert!(scheduler.unregister_workflow(&job_id).await);
    assert!(!scheduler.unregister_workflow(&job_id).await);
}

#[tokio::test]
async fn test_failed_workflow_is_still_a_successful_trigger() {
    let fake = RecordingTask::new().with_behavior("a", Behavior::failing());
    let scheduler = scheduler_with(&fake);

    let job_id = scheduler
        .register_workflow(
            TestWorkflowBuilder::new("fragile").add_task("a", &[]).build(),
            "0 * * * *",
        )
        .await
        .unwrap();

    let response = scheduler.handle_cron_request(&job_id).await;
    assert!(response.success);
    assert!(response.message.contains("fragile"));
    assert!(response.message.contains("failed"));

    let metrics = scheduler.monitor().workflow_metrics().await;
    assert_eq!(metrics.failed_executions, 1);
    assert_eq!(metrics.success_rate, 0.0);
}

#[tokio::test]
async fn test_builtin_routines_run_through_trigger() {
    let fake = RecordingTask::new();
    let monitor = Arc::new(WorkflowMonitor::new(10));
    let scheduler = WorkflowScheduler::new(Arc::new(orchestrator_with(&fake, 5)), Arc::clone(&monitor))
        .with_routines(builtin_routines(Arc::clone(&monitor)).unwrap());

    let jobs = scheduler.list_jobs().await;
    let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["health-check", "metrics-snapshot"]);
    assert!(jobs.iter().all(|j| j.kind == JobKind::Routine));

    for id in ["health-check", "metrics-snapshot"] {
        let response = scheduler.handle_cron_request(id).await;
        assert!(response.success, "{}", response.message);
        assert_eq!(response.message, format!("Routine '{}' completed", id));
    }

    assert!(scheduler.run_job("health-check").await.unwrap().is_none());
    let health = scheduler
        .list_jobs()
        .await
        .into_iter()
        .find(|j| j.id == "health-check")
        .unwrap();
    assert_eq!(health.run_count, 2);
}

#[tokio::test]
async fn test_failing_routine_reports_failure() {
    let (routine, calls) = counting_routine("counting", true);
    let scheduler = scheduler_with(&RecordingTask::new()).with_routines(vec![routine]);

    let response = scheduler.handle_cron_request("counting").await;
    assert!(!response.success);
    assert_eq!(
        response.message,
        "Routine 'counting' failed: backend unavailable"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.list_jobs().await[0].run_count, 0);

    assert!(scheduler.disable_job("counting").await);
    let response = scheduler.handle_cron_request("counting").await;
    assert!(!response.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_due_jobs_skips_disabled() {
    let fake = RecordingTask::new();
    let (routine, calls) = counting_routine("counting", false);
    let scheduler = scheduler_with(&fake).with_routines(vec![routine]);

    let active = scheduler
        .register_workflow(
            TestWorkflowBuilder::new("active").add_task("a", &[]).build(),
            "0 0 1 1 *",
        )
        .await
        .unwrap();
    let paused = scheduler
        .register_workflow(
            TestWorkflowBuilder::new("paused").add_task("b", &[]).build(),
            "0 0 1 1 *",
        )
        .await
        .unwrap();
    scheduler.disable_job(&paused).await;

    // Nothing is due yet
    assert!(scheduler.run_due_jobs(Utc::now()).await.is_empty());

    let later = Utc::now() + ChronoDuration::days(400);
    let ran = scheduler.run_due_jobs(later).await;

    let ran_ids: Vec<&str> = ran.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ran_ids, vec![active.as_str(), "counting"]);
    assert!(ran.iter().all(|(_, response)| response.success));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.call_order(), vec!["a"]);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown() {
    let scheduler = Arc::new(
        scheduler_with(&RecordingTask::new()).with_tick_interval(Duration::from_millis(10)),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(30)).await;
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
}
