// ABOUTME: Aggregate workflow and per-task metrics
// ABOUTME: Maintains counters and online running means updated on every recorded execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::{TaskExecution, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub average_duration_ms: u64,
    /// Percentage, two decimals
    pub success_rate: f64,
    pub last_execution: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub task_id: String,
    pub executions: u64,
    pub failures: u64,
    pub average_duration_ms: f64,
    /// Percentage of executions that failed
    pub failure_rate: f64,
}

impl TaskMetrics {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            ..Self::default()
        }
    }

    /// Incremental mean update for duration and failure rate
    pub fn observe(&mut self, task: &TaskExecution) {
        self.executions += 1;
        let n = self.executions as f64;

        let failed = task.status == TaskStatus::Failed;
        if failed {
            self.failures += 1;
        }

        let sample = if failed { 100.0 } else { 0.0 };
        self.failure_rate += (sample - self.failure_rate) / n;
        self.average_duration_ms += (duration_ms(task.duration) - self.average_duration_ms) / n;
    }
}

pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
