// ABOUTME: Script task implementation evaluating embedded rhai scripts
// ABOUTME: Runs on a blocking thread and aborts the script when the attempt is dropped

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use super::TaskImplementation;
use crate::engine::error::TaskError;
use crate::engine::{ExecutionContext, TaskOutput};
use crate::parser::{TaskDefinition, TaskKind};
use crate::script::ScriptEngine;

pub struct ScriptTask {
    engine: ScriptEngine,
}

impl ScriptTask {
    pub fn new(engine: ScriptEngine) -> Self {
        Self { engine }
    }
}

/// Raises the abort flag when the owning attempt future goes away
struct AbortOnDrop(Arc<AtomicBool>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl TaskImplementation for ScriptTask {
    async fn execute(
        &self,
        task: &TaskDefinition,
        context: &ExecutionContext,
    ) -> Result<TaskOutput, TaskError> {
        let TaskKind::Script { script } = &task.kind else {
            return Err(TaskError::InvalidConfig(format!(
                "task '{}' is not a script task",
                task.id
            )));
        };

        info!("Executing script task: {}", task.id);

        let abort = Arc::new(AtomicBool::new(false));
        let _guard = AbortOnDrop(Arc::clone(&abort));

        let engine = self.engine.clone();
        let script = script.clone();
        let env = context.environment.clone();
        let ctx = context.script_context();

        let value = tokio::task::spawn_blocking(move || engine.run_script(&script, &env, &ctx, abort))
            .await
            .map_err(|e| TaskError::failed(format!("script task panicked: {}", e)))?
            .map_err(|e| TaskError::failed(format!("script error: {}", e)))?;

        Ok(TaskOutput::Script { value })
    }

    fn kind(&self) -> &'static str {
        "script"
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), TaskError> {
        match &task.kind {
            TaskKind::Script { script } => self
                .engine
                .check_script(script)
                .map_err(|e| TaskError::InvalidConfig(e.to_string())),
            other => Err(TaskError::InvalidConfig(format!(
                "expected a script task, found '{}'",
                other
            ))),
        }
    }
}
