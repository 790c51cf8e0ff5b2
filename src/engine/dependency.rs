// ABOUTME: Dependency tracking for round-based workflow execution
// ABOUTME: Maintains running/completed/failed task sets and classifies task readiness

use std::collections::HashSet;

use crate::parser::TaskDefinition;

/// Where a task stands relative to its dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Runnable,
    Waiting,
    /// A dependency failed; the task must fail without running
    Cascade(String),
}

#[derive(Debug, Default)]
pub struct DependencyTracker {
    running: HashSet<String>,
    completed: HashSet<String>,
    failed: HashSet<String>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self, task_id: &str) -> bool {
        self.completed.contains(task_id) || self.failed.contains(task_id)
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.running.contains(task_id)
    }

    /// A failed dependency wins over unmet ones, checked in declaration order
    pub fn classify(&self, task: &TaskDefinition) -> Readiness {
        if let Some(dep) = task.depends_on.iter().find(|d| self.failed.contains(*d)) {
            return Readiness::Cascade(dep.clone());
        }

        if task.depends_on.iter().all(|d| self.completed.contains(d)) {
            Readiness::Runnable
        } else {
            Readiness::Waiting
        }
    }

    /// Dependencies that have not completed
    pub fn pending_dependencies(&self, task: &TaskDefinition) -> Vec<String> {
        task.depends_on
            .iter()
            .filter(|d| !self.completed.contains(*d))
            .cloned()
            .collect()
    }

    pub fn mark_running(&mut self, task_id: &str) {
        self.running.insert(task_id.to_string());
    }

    /// Completed and skipped tasks both satisfy dependents
    pub fn mark_completed(&mut self, task_id: &str) {
        self.running.remove(task_id);
        self.completed.insert(task_id.to_string());
    }

    pub fn mark_failed(&mut self, task_id: &str) {
        self.running.remove(task_id);
        self.failed.insert(task_id.to_string());
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
