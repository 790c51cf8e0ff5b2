// ABOUTME: Error types for workflow parsing and validation
// ABOUTME: Defines specific error types for parser module operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read workflow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Workflow name cannot be empty")]
    EmptyName,

    #[error("Empty workflow: no tasks defined")]
    EmptyWorkflow,

    #[error("Task at position {index} has an empty id")]
    EmptyTaskId { index: usize },

    #[error("Duplicate task id: {task}")]
    DuplicateTask { task: String },

    #[error("Invalid task configuration for '{task}': {reason}")]
    InvalidTaskConfig { task: String, reason: String },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Circular dependency detected in tasks: {tasks:?}")]
    CircularDependency { tasks: Vec<String> },

    #[error("Invalid cadence '{cadence}': {reason}")]
    InvalidCadence { cadence: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ParserError>;
