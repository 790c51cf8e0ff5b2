// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides workflow builders and a scripted fake task implementation

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use conductor::engine::{
    ExecutionContext, ExecutorSettings, OrchestratorSettings, TaskError, TaskExecutor, TaskOutput,
    WorkflowOrchestrator,
};
use conductor::parser::{Backoff, RetryPolicy, TaskDefinition, TaskKind, WorkflowDefinition};
use conductor::tasks::{TaskImplementation, TaskRegistry};

pub struct TestWorkflowBuilder {
    name: String,
    environment: HashMap<String, String>,
    timeout: Option<Duration>,
    tasks: Vec<TaskDefinition>,
}

impl TestWorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            environment: HashMap::new(),
            timeout: None,
            tasks: Vec::new(),
        }
    }

    pub fn with_variable(mut self, key: &str, value: &str) -> Self {
        self.environment.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_task(mut self, task: TaskDefinition) -> Self {
        self.tasks.push(task);
        self
    }

    /// A task dispatched to the fake "script" implementation
    pub fn add_task(self, id: &str, depends_on: &[&str]) -> Self {
        self.with_task(script_task(id, depends_on))
    }

    pub fn add_echo_task(self, id: &str, message: &str) -> Self {
        self.with_task(process_task(id, &format!("echo {}", message), &[]))
    }

    pub fn build(self) -> WorkflowDefinition {
        WorkflowDefinition {
            name: self.name,
            version: "1.0".to_string(),
            description: None,
            tasks: self.tasks,
            trigger: Default::default(),
            environment: self.environment,
            notifications: None,
            timeout: self.timeout,
        }
    }

    pub async fn write_to_file(self, path: &Path) -> std::io::Result<WorkflowDefinition> {
        let workflow = self.build();
        let yaml = workflow
            .to_yaml()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        tokio::fs::write(path, yaml).await?;
        Ok(workflow)
    }
}

fn base_task(id: &str, kind: TaskKind, depends_on: &[&str]) -> TaskDefinition {
    TaskDefinition {
        id: id.to_string(),
        name: None,
        kind,
        depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        condition: None,
        timeout: None,
        retry: None,
        on_success: Vec::new(),
        on_failure: Vec::new(),
        environment: HashMap::new(),
    }
}

pub fn script_task(id: &str, depends_on: &[&str]) -> TaskDefinition {
    base_task(
        id,
        TaskKind::Script {
            script: "true".to_string(),
        },
        depends_on,
    )
}

pub fn process_task(id: &str, command: &str, depends_on: &[&str]) -> TaskDefinition {
    base_task(
        id,
        TaskKind::Process {
            command: command.to_string(),
            cwd: None,
        },
        depends_on,
    )
}

pub fn retry(attempts: u32, delay: Duration, backoff: Backoff) -> Option<RetryPolicy> {
    Some(RetryPolicy {
        attempts,
        delay,
        backoff,
    })
}

/// How the fake implementation behaves for one task id
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub delay: Duration,
    /// Fail this many invocations before succeeding
    pub fail_first: u32,
    pub always_fail: bool,
    /// Never resolve; only a timeout ends the attempt
    pub hang: bool,
}

impl Behavior {
    pub fn delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Default::default()
        }
    }

    pub fn fail_first(times: u32) -> Self {
        Self {
            fail_first: times,
            ..Default::default()
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub task_id: String,
    pub started: Instant,
    pub finished: Option<Instant>,
}

/// Fake implementation registered under the "script" kind
#[derive(Clone, Default)]
pub struct RecordingTask {
    behaviors: Arc<Mutex<HashMap<String, Behavior>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(self, task_id: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(task_id.to_string(), behavior);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocations_of(&self, task_id: &str) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|i| i.task_id == task_id)
            .collect()
    }

    pub fn call_order(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.task_id).collect()
    }

    /// Most invocations in flight at any instant
    pub fn max_concurrency(&self) -> usize {
        let invocations = self.invocations();
        invocations
            .iter()
            .map(|current| {
                invocations
                    .iter()
                    .filter(|other| {
                        other.started <= current.started
                            && other.finished.map_or(true, |end| end > current.started)
                    })
                    .count()
            })
            .max()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TaskImplementation for RecordingTask {
    async fn execute(
        &self,
        task: &TaskDefinition,
        _context: &ExecutionContext,
    ) -> Result<TaskOutput, TaskError> {
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&task.id)
            .cloned()
            .unwrap_or_default();

        let index = {
            let mut invocations = self.invocations.lock().unwrap();
            invocations.push(Invocation {
                task_id: task.id.clone(),
                started: Instant::now(),
                finished: None,
            });
            invocations.len() - 1
        };
        let call_number = self.invocations_of(&task.id).len() as u32;

        if behavior.hang {
            std::future::pending::<()>().await;
        }
        if !behavior.delay.is_zero() {
            tokio::time::sleep(behavior.delay).await;
        }

        self.invocations.lock().unwrap()[index].finished = Some(Instant::now());

        if behavior.always_fail || call_number <= behavior.fail_first {
            return Err(TaskError::failed(format!(
                "{} failed on call {}",
                task.id, call_number
            )));
        }

        Ok(TaskOutput::Script {
            value: serde_json::json!({ "task": task.id, "call": call_number }),
        })
    }

    fn kind(&self) -> &'static str {
        "script"
    }
}

pub fn orchestrator_with(fake: &RecordingTask, max_parallel: usize) -> WorkflowOrchestrator {
    let mut registry = TaskRegistry::empty();
    registry.register(Box::new(fake.clone()));

    let executor = TaskExecutor::new(Arc::new(registry), ExecutorSettings::default());
    WorkflowOrchestrator::new(
        executor,
        OrchestratorSettings {
            max_parallel_tasks: max_parallel,
            ..OrchestratorSettings::default()
        },
    )
}
