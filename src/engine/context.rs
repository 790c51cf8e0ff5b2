// ABOUTME: Execution context handed to every task attempt
// ABOUTME: Carries run identity, the merged environment and the active attempt timeout

use std::collections::HashMap;
use std::time::Duration;

use crate::parser::{TaskDefinition, WorkflowDefinition};

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub workflow_id: String,
    pub workflow_name: String,
    pub execution_id: String,
    pub task_id: String,
    pub environment: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl ExecutionContext {
    pub fn new(workflow: &WorkflowDefinition, execution_id: &str) -> Self {
        Self {
            workflow_id: workflow.id(),
            workflow_name: workflow.name.clone(),
            execution_id: execution_id.to_string(),
            task_id: "workflow".to_string(),
            environment: workflow.environment.clone(),
            timeout: None,
        }
    }

    /// Derive a task-scoped context; task variables override workflow ones
    pub fn for_task(&self, task: &TaskDefinition) -> Self {
        let mut environment = self.environment.clone();
        environment.extend(task.environment.clone());

        Self {
            workflow_id: self.workflow_id.clone(),
            workflow_name: self.workflow_name.clone(),
            execution_id: self.execution_id.clone(),
            task_id: task.id.clone(),
            environment,
            timeout: self.timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Identity map exposed to scripts as `ctx`
    pub fn script_context(&self) -> HashMap<String, String> {
        HashMap::from([
            ("workflow_id".to_string(), self.workflow_id.clone()),
            ("workflow_name".to_string(), self.workflow_name.clone()),
            ("execution_id".to_string(), self.execution_id.clone()),
            ("task_id".to_string(), self.task_id.clone()),
        ])
    }
}
