// ABOUTME: Built-in maintenance routines for the scheduler
// ABOUTME: Periodic health checks and metrics snapshots over the workflow monitor

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::cadence::{Cadence, CadenceError};
use super::job::{NamedRoutine, RoutineHandler};
use super::SchedulerError;
use crate::monitor::{HealthStatus, WorkflowMonitor};

pub const HEALTH_CHECK_ID: &str = "health-check";
pub const METRICS_SNAPSHOT_ID: &str = "metrics-snapshot";

pub struct HealthCheckRoutine {
    monitor: Arc<WorkflowMonitor>,
}

#[async_trait]
impl RoutineHandler for HealthCheckRoutine {
    async fn run(&self) -> Result<String, SchedulerError> {
        let report = self.monitor.health_report().await;

        if report.status == HealthStatus::Healthy {
            info!("Health check: {}", report.status);
        } else {
            warn!(
                "Health check: {} ({} issue(s)): {:?}",
                report.status,
                report.issues.len(),
                report.issues
            );
        }

        Ok(format!("health status: {}", report.status))
    }
}

pub struct MetricsSnapshotRoutine {
    monitor: Arc<WorkflowMonitor>,
}

#[async_trait]
impl RoutineHandler for MetricsSnapshotRoutine {
    async fn run(&self) -> Result<String, SchedulerError> {
        let export = self.monitor.export_metrics().await;
        let json = serde_json::to_string(&export).map_err(|e| SchedulerError::Routine {
            id: METRICS_SNAPSHOT_ID.to_string(),
            message: e.to_string(),
        })?;

        info!("Metrics snapshot: {}", json);
        Ok(format!(
            "metrics snapshot of {} execution(s)",
            export.workflow.total_executions
        ))
    }
}

/// The fixed routine catalog
pub fn builtin_routines(monitor: Arc<WorkflowMonitor>) -> Result<Vec<NamedRoutine>, CadenceError> {
    Ok(vec![
        NamedRoutine::new(
            HEALTH_CHECK_ID,
            "Workflow health check",
            Cadence::parse("*/5 * * * *")?,
            Arc::new(HealthCheckRoutine {
                monitor: Arc::clone(&monitor),
            }),
        ),
        NamedRoutine::new(
            METRICS_SNAPSHOT_ID,
            "Metrics snapshot",
            Cadence::parse("0 * * * *")?,
            Arc::new(MetricsSnapshotRoutine { monitor }),
        ),
    ])
}
