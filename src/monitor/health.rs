// ABOUTME: Health verdict derived from workflow and task metrics
// ABOUTME: Collects issues and recommendations and classifies overall health

use serde::{Deserialize, Serialize};

use super::metrics::{TaskMetrics, WorkflowMetrics};

pub const CRITICAL_SUCCESS_RATE: f64 = 50.0;
pub const WARNING_SUCCESS_RATE: f64 = 80.0;
pub const SLOW_TASK_MS: f64 = 60_000.0;
pub const HIGH_FAILURE_RATE: f64 = 20.0;
pub const MAX_HIGH_FAILURE_TASKS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub metrics: WorkflowMetrics,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Pure classification. An empty monitor reports healthy.
pub fn assess_health(metrics: &WorkflowMetrics, tasks: &[TaskMetrics]) -> HealthReport {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    let has_runs = metrics.total_executions > 0;
    let rate = metrics.success_rate;

    if has_runs && rate < CRITICAL_SUCCESS_RATE {
        issues.push(format!("Critical: workflow success rate is {:.2}%", rate));
        recommendations
            .push("Investigate recurring task failures and review workflow definitions".to_string());
    } else if has_runs && rate < WARNING_SUCCESS_RATE {
        issues.push(format!("Warning: workflow success rate is {:.2}%", rate));
        recommendations.push("Review failing tasks and consider adding retry policies".to_string());
    }

    for task in tasks.iter().filter(|t| t.average_duration_ms > SLOW_TASK_MS) {
        issues.push(format!(
            "Task '{}' has a high average duration ({:.0} ms)",
            task.task_id, task.average_duration_ms
        ));
        recommendations.push(format!(
            "Optimize task '{}' or split it into smaller tasks",
            task.task_id
        ));
    }

    let high_failure: Vec<&TaskMetrics> = tasks
        .iter()
        .filter(|t| t.failure_rate > HIGH_FAILURE_RATE)
        .collect();
    for task in &high_failure {
        issues.push(format!(
            "Task '{}' has a high failure rate ({:.2}%)",
            task.task_id, task.failure_rate
        ));
        recommendations.push(format!(
            "Add a retry policy or fix the root cause of failures in task '{}'",
            task.task_id
        ));
    }

    let status = if (has_runs && rate < CRITICAL_SUCCESS_RATE)
        || high_failure.len() > MAX_HIGH_FAILURE_TASKS
    {
        HealthStatus::Unhealthy
    } else if (has_runs && rate < WARNING_SUCCESS_RATE) || !issues.is_empty() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    HealthReport {
        status,
        metrics: metrics.clone(),
        issues,
        recommendations,
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}
