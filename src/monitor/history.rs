// ABOUTME: Fixed-capacity execution history
// ABOUTME: Most-recent-first ring buffer over VecDeque with constant-time eviction

use std::collections::VecDeque;

use crate::engine::{WorkflowExecution, WorkflowStatus};

#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    entries: VecDeque<WorkflowExecution>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, execution: WorkflowExecution) {
        self.entries.push_front(execution);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn recent(&self, limit: usize) -> Vec<WorkflowExecution> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn with_status(&self, status: WorkflowStatus) -> Vec<WorkflowExecution> {
        self.entries
            .iter()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
