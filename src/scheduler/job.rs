// ABOUTME: Scheduler registry entries for workflow jobs and named routines
// ABOUTME: Tracks enablement, run counts and next-run estimates for each job

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::cadence::Cadence;
use super::SchedulerError;
use crate::parser::WorkflowDefinition;

/// Maintenance work addressable by a stable routine id
#[async_trait]
pub trait RoutineHandler: Send + Sync {
    /// Returns a one-line summary of what the routine did
    async fn run(&self) -> Result<String, SchedulerError>;
}

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: String,
    pub workflow: WorkflowDefinition,
    pub cadence: Cadence,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
}

#[derive(Clone)]
pub struct NamedRoutine {
    pub id: String,
    pub name: String,
    pub cadence: Cadence,
    pub handler: Arc<dyn RoutineHandler>,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Workflow,
    Routine,
}

/// Read-only listing entry covering both registries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub name: String,
    pub kind: JobKind,
    pub cadence: String,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
}

impl ScheduledJob {
    pub fn new(id: String, workflow: WorkflowDefinition, cadence: Cadence) -> Self {
        let next_run = cadence.next_after(Utc::now());
        Self {
            id,
            workflow,
            cadence,
            enabled: true,
            last_run: None,
            next_run,
            run_count: 0,
        }
    }

    pub fn record_run(&mut self, at: DateTime<Utc>, counted: bool) {
        if counted {
            self.run_count += 1;
            self.last_run = Some(at);
        }
        self.next_run = self.cadence.next_after(at);
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.is_some_and(|next| next <= now)
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            name: self.workflow.name.clone(),
            kind: JobKind::Workflow,
            cadence: self.cadence.to_string(),
            enabled: self.enabled,
            last_run: self.last_run,
            next_run: self.next_run,
            run_count: self.run_count,
        }
    }
}

impl NamedRoutine {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cadence: Cadence,
        handler: Arc<dyn RoutineHandler>,
    ) -> Self {
        let next_run = cadence.next_after(Utc::now());
        Self {
            id: id.into(),
            name: name.into(),
            cadence,
            handler,
            enabled: true,
            last_run: None,
            next_run,
            run_count: 0,
        }
    }

    pub fn record_run(&mut self, at: DateTime<Utc>, counted: bool) {
        if counted {
            self.run_count += 1;
            self.last_run = Some(at);
        }
        self.next_run = self.cadence.next_after(at);
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.is_some_and(|next| next <= now)
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: JobKind::Routine,
            cadence: self.cadence.to_string(),
            enabled: self.enabled,
            last_run: self.last_run,
            next_run: self.next_run,
            run_count: self.run_count,
        }
    }
}

impl std::fmt::Debug for NamedRoutine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedRoutine")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cadence", &self.cadence.to_string())
            .field("enabled", &self.enabled)
            .field("run_count", &self.run_count)
            .finish()
    }
}
