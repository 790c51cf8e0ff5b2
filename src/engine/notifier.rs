// ABOUTME: Best-effort webhook notifications for finished workflow executions
// ABOUTME: Posts a JSON summary to the workflow's configured notification endpoint

use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::result::{WorkflowExecution, WorkflowStatus};
use crate::parser::{NotifyOn, WorkflowDefinition};

pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl Notifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn should_notify(on: NotifyOn, status: WorkflowStatus) -> bool {
        match on {
            NotifyOn::Always => true,
            NotifyOn::Failure => status == WorkflowStatus::Failed,
            NotifyOn::Success => status == WorkflowStatus::Completed,
        }
    }

    pub fn payload(execution: &WorkflowExecution) -> serde_json::Value {
        json!({
            "workflow": execution.workflow_name,
            "workflow_id": execution.workflow_id,
            "execution_id": execution.id,
            "status": execution.status,
            "duration_ms": execution.duration.as_millis() as u64,
            "error": execution.error,
            "failed_tasks": execution.failed_task_ids(),
        })
    }

    /// Delivery failures are logged and swallowed
    pub async fn notify(&self, workflow: &WorkflowDefinition, execution: &WorkflowExecution) {
        let Some(ref config) = workflow.notifications else {
            return;
        };

        if !Self::should_notify(config.on, execution.status) {
            debug!(
                "Skipping notification for {} with status {}",
                workflow.name, execution.status
            );
            return;
        }

        match self
            .client
            .post(&config.webhook)
            .timeout(self.timeout)
            .json(&Self::payload(execution))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("Notification delivered to {}", config.webhook);
            }
            Ok(response) => {
                warn!(
                    "Notification webhook {} returned status {}",
                    config.webhook,
                    response.status()
                );
            }
            Err(e) => {
                warn!("Failed to deliver notification to {}: {}", config.webhook, e);
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}
