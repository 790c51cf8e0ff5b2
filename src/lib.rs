// ABOUTME: Main library module for the conductor workflow orchestration engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod monitor;
pub mod output;
pub mod parser;
pub mod scheduler;
pub mod script;
pub mod tasks;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{
    TaskExecution, TaskExecutor, TaskStatus, WorkflowExecution, WorkflowOrchestrator,
    WorkflowStatus,
};
pub use monitor::{HealthReport, HealthStatus, WorkflowMonitor};
pub use parser::{TaskDefinition, WorkflowDefinition, WorkflowValidator};
pub use scheduler::{CronResponse, WorkflowScheduler};
pub use tasks::{TaskImplementation, TaskRegistry};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
