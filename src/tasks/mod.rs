// ABOUTME: Native task implementations for the supported task kinds
// ABOUTME: Contains the TaskImplementation trait, the kind registry and shared task settings

pub mod http;
pub mod process;
pub mod script;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::error::TaskError;
use crate::engine::{ExecutionContext, TaskOutput};
use crate::parser::TaskDefinition;
use crate::script::ScriptEngine;

pub use http::HttpTask;
pub use process::{ProcessBackend, ProcessTask};
pub use script::ScriptTask;

pub const TRUNCATION_MARKER: &str = "\n... [output truncated]";

#[async_trait]
pub trait TaskImplementation: Send + Sync {
    async fn execute(
        &self,
        task: &TaskDefinition,
        context: &ExecutionContext,
    ) -> Result<TaskOutput, TaskError>;

    fn kind(&self) -> &'static str;

    fn validate(&self, _task: &TaskDefinition) -> Result<(), TaskError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSettings {
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default)]
    pub process_backend: ProcessBackend,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            max_output_bytes: default_max_output_bytes(),
            process_backend: ProcessBackend::default(),
        }
    }
}

pub struct TaskRegistry {
    implementations: HashMap<String, Box<dyn TaskImplementation>>,
}

impl TaskRegistry {
    pub fn new(settings: &TaskSettings) -> Self {
        let client = reqwest::Client::new();
        let mut registry = Self::empty();

        registry.register(Box::new(ProcessTask::new(settings.clone(), client.clone())));
        registry.register(Box::new(HttpTask::new(client, settings.max_output_bytes)));
        registry.register(Box::new(ScriptTask::new(ScriptEngine::new())));

        registry
    }

    pub fn empty() -> Self {
        Self {
            implementations: HashMap::new(),
        }
    }

    /// Register an implementation, replacing any existing one for the same kind
    pub fn register(&mut self, implementation: Box<dyn TaskImplementation>) {
        let kind = implementation.kind().to_string();
        self.implementations.insert(kind, implementation);
    }

    pub fn get_implementation(&self, kind: &str) -> Option<&dyn TaskImplementation> {
        self.implementations.get(kind).map(|imp| imp.as_ref())
    }

    fn resolve(&self, task: &TaskDefinition) -> Result<&dyn TaskImplementation, TaskError> {
        self.get_implementation(task.kind.as_str())
            .ok_or_else(|| TaskError::KindNotSupported {
                kind: task.kind.to_string(),
            })
    }

    pub fn validate(&self, task: &TaskDefinition) -> Result<(), TaskError> {
        self.resolve(task)?.validate(task)
    }

    pub async fn execute(
        &self,
        task: &TaskDefinition,
        context: &ExecutionContext,
    ) -> Result<TaskOutput, TaskError> {
        self.resolve(task)?.execute(task, context).await
    }

    pub fn list_supported_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.implementations.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(&TaskSettings::default())
    }
}

/// Lossy UTF-8 decode, marking output that was cut at the byte cap
pub(crate) fn capture_text(bytes: &[u8], truncated: bool) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

/// Cap an in-memory buffer at `limit` bytes
pub(crate) fn capped_text(bytes: &[u8], limit: usize) -> String {
    if bytes.len() > limit {
        capture_text(&bytes[..limit], true)
    } else {
        capture_text(bytes, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_builtin_kinds() {
        let registry = TaskRegistry::default();
        assert_eq!(
            registry.list_supported_kinds(),
            vec!["http", "process", "script"]
        );
        assert!(registry.get_implementation("email").is_none());
    }

    #[test]
    fn test_capped_text_marks_truncation() {
        assert_eq!(capped_text(b"hello", 10), "hello");
        let capped = capped_text(b"hello world", 5);
        assert!(capped.starts_with("hello"));
        assert!(capped.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: TaskSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings.shell, "/bin/sh");
        assert_eq!(settings.max_output_bytes, 1024 * 1024);
        assert_eq!(settings.process_backend, ProcessBackend::default());
    }
}
