// ABOUTME: Workflow monitor aggregating execution outcomes
// ABOUTME: Records executions and serves metrics, health and history projections

pub mod health;
pub mod history;
pub mod metrics;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::engine::{WorkflowExecution, WorkflowStatus};

pub use health::{assess_health, HealthReport, HealthStatus};
pub use history::ExecutionHistory;
pub use metrics::{TaskMetrics, WorkflowMetrics};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsExport {
    pub workflow: WorkflowMetrics,
    pub tasks: Vec<TaskMetrics>,
    pub health: HealthReport,
    pub exported_at: DateTime<Utc>,
}

#[derive(Debug)]
struct MonitorState {
    total: u64,
    successful: u64,
    failed: u64,
    total_duration_ms: f64,
    last_execution: Option<DateTime<Utc>>,
    tasks: IndexMap<String, TaskMetrics>,
    history: ExecutionHistory,
}

#[derive(Debug)]
pub struct WorkflowMonitor {
    state: RwLock<MonitorState>,
}

impl WorkflowMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(MonitorState {
                total: 0,
                successful: 0,
                failed: 0,
                total_duration_ms: 0.0,
                last_execution: None,
                tasks: IndexMap::new(),
                history: ExecutionHistory::new(capacity),
            }),
        }
    }

    /// The only mutation entry point
    pub async fn record_execution(&self, execution: &WorkflowExecution) {
        let mut state = self.state.write().await;

        state.total += 1;
        match execution.status {
            WorkflowStatus::Completed => state.successful += 1,
            WorkflowStatus::Failed => state.failed += 1,
            _ => {}
        }
        state.total_duration_ms += metrics::duration_ms(execution.duration);
        state.last_execution = Some(execution.completed_at.unwrap_or(execution.started_at));

        for task in execution.tasks.values() {
            state
                .tasks
                .entry(task.id.clone())
                .or_insert_with(|| TaskMetrics::new(task.id.clone()))
                .observe(task);
        }

        state.history.push(execution.clone());

        debug!(
            "Recorded execution {} of {} ({}); {} total",
            execution.id, execution.workflow_name, execution.status, state.total
        );
    }

    pub async fn workflow_metrics(&self) -> WorkflowMetrics {
        let state = self.state.read().await;
        Self::compute_metrics(&state)
    }

    fn compute_metrics(state: &MonitorState) -> WorkflowMetrics {
        let (success_rate, average_duration_ms) = if state.total == 0 {
            (0.0, 0)
        } else {
            let total = state.total as f64;
            (
                metrics::round2(state.successful as f64 / total * 100.0),
                (state.total_duration_ms / total).round() as u64,
            )
        };

        WorkflowMetrics {
            total_executions: state.total,
            successful_executions: state.successful,
            failed_executions: state.failed,
            average_duration_ms,
            success_rate,
            last_execution: state.last_execution,
        }
    }

    pub async fn task_metrics(&self) -> Vec<TaskMetrics> {
        let state = self.state.read().await;
        state.tasks.values().cloned().collect()
    }

    pub async fn health_report(&self) -> HealthReport {
        let state = self.state.read().await;
        let tasks: Vec<TaskMetrics> = state.tasks.values().cloned().collect();
        assess_health(&Self::compute_metrics(&state), &tasks)
    }

    /// Most recent first
    pub async fn recent_executions(&self, limit: usize) -> Vec<WorkflowExecution> {
        self.state.read().await.history.recent(limit)
    }

    pub async fn executions_by_status(&self, status: WorkflowStatus) -> Vec<WorkflowExecution> {
        self.state.read().await.history.with_status(status)
    }

    pub async fn export_metrics(&self) -> MetricsExport {
        let state = self.state.read().await;
        let workflow = Self::compute_metrics(&state);
        let tasks: Vec<TaskMetrics> = state.tasks.values().cloned().collect();
        let health = assess_health(&workflow, &tasks);

        MetricsExport {
            workflow,
            tasks,
            health,
            exported_at: Utc::now(),
        }
    }
}

impl Default for WorkflowMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
