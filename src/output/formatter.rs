// ABOUTME: Output formatters for different result formats (JSON, YAML, text)
// ABOUTME: Renders workflow executions, health reports and job listings

use std::fmt::Write as _;

use super::error::{OutputError, Result};
use crate::engine::{TaskExecution, TaskOutput, TaskStatus, WorkflowExecution};
use crate::monitor::HealthReport;
use crate::scheduler::JobSummary;

pub trait OutputFormatter: Send + Sync {
    fn format_execution(&self, execution: &WorkflowExecution) -> Result<String>;

    fn format_health(&self, report: &HealthReport) -> Result<String>;

    fn format_jobs(&self, jobs: &[JobSummary]) -> Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct YamlFormatter;

pub struct TextFormatter {
    max_output_length: usize,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }

    fn render<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(value).map_err(OutputError::SerializationError)
        } else {
            serde_json::to_string(value).map_err(OutputError::SerializationError)
        }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_execution(&self, execution: &WorkflowExecution) -> Result<String> {
        self.render(execution)
    }

    fn format_health(&self, report: &HealthReport) -> Result<String> {
        self.render(report)
    }

    fn format_jobs(&self, jobs: &[JobSummary]) -> Result<String> {
        self.render(&jobs)
    }
}

impl OutputFormatter for YamlFormatter {
    fn format_execution(&self, execution: &WorkflowExecution) -> Result<String> {
        serde_yaml::to_string(execution).map_err(OutputError::YamlSerializationError)
    }

    fn format_health(&self, report: &HealthReport) -> Result<String> {
        serde_yaml::to_string(report).map_err(OutputError::YamlSerializationError)
    }

    fn format_jobs(&self, jobs: &[JobSummary]) -> Result<String> {
        serde_yaml::to_string(&jobs).map_err(OutputError::YamlSerializationError)
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self {
            max_output_length: 500,
        }
    }

    pub fn with_max_output_length(mut self, max: usize) -> Self {
        self.max_output_length = max;
        self
    }

    fn clip(&self, text: &str) -> String {
        match text.char_indices().nth(self.max_output_length) {
            Some((cut, _)) => format!("{}... [truncated]", &text[..cut]),
            None => text.to_string(),
        }
    }

    fn format_task(&self, task: &TaskExecution) -> String {
        let status_icon = match task.status {
            TaskStatus::Completed => "✓",
            TaskStatus::Failed => "✗",
            TaskStatus::Skipped => "⊘",
            TaskStatus::Pending => "⧖",
            TaskStatus::Running => "⟳",
        };

        let mut output = format!(
            "{} {} [{}] [{:.2}s]",
            status_icon,
            task.id,
            task.status,
            task.duration.as_secs_f64()
        );

        if task.attempts > 1 {
            let _ = write!(output, " (attempts: {})", task.attempts);
        }

        let summary = match task.output {
            Some(TaskOutput::Process {
                ref stdout,
                exit_code,
                ..
            }) => Some(format!("exit {}: {}", exit_code, stdout.trim_end())),
            Some(TaskOutput::Http { status, ref body, .. }) => {
                Some(format!("HTTP {}: {}", status, body.trim_end()))
            }
            Some(TaskOutput::Script { ref value }) => Some(value.to_string()),
            None => None,
        };

        if let Some(summary) = summary {
            if !summary.is_empty() {
                let _ = write!(
                    output,
                    "\n    Output: {}",
                    self.clip(&summary).replace('\n', "\n    ")
                );
            }
        }

        if let Some(ref error) = task.error {
            let _ = write!(output, "\n    Error: {}", error);
        }

        if !task.triggered_callbacks.is_empty() {
            let _ = write!(
                output,
                "\n    Callbacks: {}",
                task.triggered_callbacks.join(", ")
            );
        }

        output
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TextFormatter {
    fn format_execution(&self, execution: &WorkflowExecution) -> Result<String> {
        let mut output = String::new();

        let _ = writeln!(output, "Workflow: {}", execution.workflow_name);
        let _ = writeln!(output, "Execution: {}", execution.id);
        let _ = writeln!(output, "Status: {}", execution.status);
        let _ = writeln!(output, "Started: {}", execution.started_at.to_rfc3339());
        let _ = writeln!(output, "Duration: {:.2}s", execution.duration.as_secs_f64());
        if let Some(ref error) = execution.error {
            let _ = writeln!(output, "Error: {}", error);
        }

        let _ = writeln!(
            output,
            "\nSummary: {} completed, {} failed, {} skipped",
            execution.count(TaskStatus::Completed),
            execution.count(TaskStatus::Failed),
            execution.count(TaskStatus::Skipped)
        );

        output.push_str("\nTasks:\n");
        for task in execution.tasks.values() {
            for line in self.format_task(task).lines() {
                let _ = writeln!(output, "  {}", line);
            }
        }

        Ok(output)
    }

    fn format_health(&self, report: &HealthReport) -> Result<String> {
        let mut output = String::new();
        let metrics = &report.metrics;

        let _ = writeln!(output, "Health: {}", report.status);
        let _ = writeln!(
            output,
            "Executions: {} ({} succeeded, {} failed)",
            metrics.total_executions, metrics.successful_executions, metrics.failed_executions
        );
        let _ = writeln!(output, "Success rate: {:.2}%", metrics.success_rate);
        let _ = writeln!(output, "Average duration: {} ms", metrics.average_duration_ms);

        if !report.issues.is_empty() {
            output.push_str("\nIssues:\n");
            for issue in &report.issues {
                let _ = writeln!(output, "  - {}", issue);
            }
        }

        if !report.recommendations.is_empty() {
            output.push_str("\nRecommendations:\n");
            for recommendation in &report.recommendations {
                let _ = writeln!(output, "  - {}", recommendation);
            }
        }

        Ok(output)
    }

    fn format_jobs(&self, jobs: &[JobSummary]) -> Result<String> {
        if jobs.is_empty() {
            return Ok("No jobs registered\n".to_string());
        }

        let mut output = String::new();
        for job in jobs {
            let next = job
                .next_run
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "{} {:<44} {:<8} {:<16} runs={} next={} ({})",
                if job.enabled { "●" } else { "○" },
                job.id,
                format!("{:?}", job.kind).to_lowercase(),
                job.cadence,
                job.run_count,
                next,
                job.name
            );
        }

        Ok(output)
    }
}
