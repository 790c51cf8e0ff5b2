// ABOUTME: Task definition structures and per-kind payloads
// ABOUTME: Defines task kinds, retry policies, and their serde defaults

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Boolean expression evaluated against the merged environment before running.
    #[serde(default, alias = "when")]
    pub condition: Option<String>,
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    #[serde(default)]
    pub on_success: Vec<String>,
    #[serde(default)]
    pub on_failure: Vec<String>,
    #[serde(default, alias = "env")]
    pub environment: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// External command run through the configured shell
    Process {
        command: String,
        #[serde(default, alias = "working_dir")]
        cwd: Option<String>,
    },
    /// HTTP request
    Http {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        body: Option<String>,
    },
    /// Sandboxed embedded script
    Script { script: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(with = "humantime_serde", default = "default_delay")]
    pub delay: Duration,
    #[serde(default)]
    pub backoff: Backoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Linear,
    Exponential,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_attempts() -> u32 {
    1
}

fn default_delay() -> Duration {
    Duration::from_secs(1)
}

impl TaskDefinition {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn attempts(&self) -> u32 {
        self.retry.as_ref().map(|r| r.attempts.max(1)).unwrap_or(1)
    }
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Process { .. } => "process",
            TaskKind::Http { .. } => "http",
            TaskKind::Script { .. } => "script",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay: default_delay(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next try after `attempt` (1-indexed) failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Linear => self.delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let shift = (attempt - 1).min(20);
                self.delay.saturating_mul(1u32 << shift)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_deserialization() {
        let yaml = r#"
id: fetch
kind: http
url: https://example.com/health
headers:
  Accept: application/json
"#;
        let task: TaskDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(task.kind.as_str(), "http");
        match task.kind {
            TaskKind::Http { method, headers, .. } => {
                assert_eq!(method, "GET");
                assert_eq!(headers.get("Accept"), Some(&"application/json".to_string()));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_retry_policy_defaults() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.attempts, 1);
        assert_eq!(retry.delay, Duration::from_secs(1));
        assert_eq!(retry.backoff, Backoff::Linear);
    }

    #[test]
    fn test_retry_delay_linear_and_exponential() {
        let linear = RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(100),
            backoff: Backoff::Linear,
        };
        assert_eq!(linear.delay_for(1), Duration::from_millis(100));
        assert_eq!(linear.delay_for(2), Duration::from_millis(200));
        assert_eq!(linear.delay_for(3), Duration::from_millis(300));

        let exponential = RetryPolicy {
            backoff: Backoff::Exponential,
            ..linear
        };
        assert_eq!(exponential.delay_for(1), Duration::from_millis(100));
        assert_eq!(exponential.delay_for(2), Duration::from_millis(200));
        assert_eq!(exponential.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_retry_policy_humantime() {
        let yaml = "attempts: 3\ndelay: 250ms\nbackoff: exponential\n";
        let retry: RetryPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(retry.attempts, 3);
        assert_eq!(retry.delay, Duration::from_millis(250));
        assert_eq!(retry.backoff, Backoff::Exponential);
    }
}
