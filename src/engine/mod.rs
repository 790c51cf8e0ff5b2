// ABOUTME: Execution engine module for the conductor workflow engine
// ABOUTME: Handles task execution, dependency-ordered orchestration and execution records

pub mod context;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod notifier;
pub mod orchestrator;
pub mod result;

pub use context::ExecutionContext;
pub use dependency::{DependencyTracker, Readiness};
pub use error::{ExecutionError, Result, TaskError};
pub use executor::{ExecutorSettings, TaskExecutor};
pub use notifier::Notifier;
pub use orchestrator::{OrchestratorSettings, WorkflowOrchestrator};
pub use result::{TaskExecution, TaskOutput, TaskStatus, WorkflowExecution, WorkflowStatus};
