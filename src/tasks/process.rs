// ABOUTME: Process task implementation running shell commands locally or through a relay
// ABOUTME: Captures capped stdout/stderr and fails on non-zero exit codes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::{capped_text, capture_text, TaskImplementation, TaskSettings};
use crate::engine::error::TaskError;
use crate::engine::{ExecutionContext, TaskOutput};
use crate::parser::{TaskDefinition, TaskKind};

/// Where process tasks run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProcessBackend {
    /// Spawn locally; use `relay_fallback` when the host cannot spawn processes
    Local {
        #[serde(default)]
        relay_fallback: Option<String>,
    },
    /// Always forward to a remote execution relay
    Relay { endpoint: String },
}

impl Default for ProcessBackend {
    fn default() -> Self {
        ProcessBackend::Local {
            relay_fallback: None,
        }
    }
}

/// Body POSTed to the relay
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest {
    pub kind: &'static str,
    pub command: String,
    pub cwd: Option<String>,
    pub env: HashMap<String, String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    exit_code: i32,
}

pub struct ProcessTask {
    settings: TaskSettings,
    client: reqwest::Client,
}

impl ProcessTask {
    pub fn new(settings: TaskSettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    fn spawn_local(&self, request: &ProcessRequest) -> std::io::Result<Child> {
        let mut command = Command::new(&self.settings.shell);
        command
            .arg("-c")
            .arg(&request.command)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own group so a cancelled attempt can take the shell's children down with it
        #[cfg(unix)]
        command.process_group(0);

        if let Some(ref cwd) = request.cwd {
            command.current_dir(cwd);
        }

        command.spawn()
    }

    async fn collect(&self, mut child: Child) -> std::io::Result<TaskOutput> {
        let limit = self.settings.max_output_bytes;
        let mut group = ProcessGroupGuard::new(&child);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr, status) = tokio::try_join!(
            read_capped(stdout, limit),
            read_capped(stderr, limit),
            child.wait()
        )?;
        group.disarm();

        Ok(TaskOutput::Process {
            stdout: capture_text(&stdout.0, stdout.1),
            stderr: capture_text(&stderr.0, stderr.1),
            exit_code: status.code().unwrap_or(-1),
        })
    }

    async fn run_relay(
        &self,
        endpoint: &str,
        request: &ProcessRequest,
    ) -> Result<TaskOutput, TaskError> {
        debug!("Forwarding process task to relay {}", endpoint);

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TaskError::failed(format!("relay request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::failed(format!(
                "relay returned status {}",
                status
            )));
        }

        let body: RelayResponse = response
            .json()
            .await
            .map_err(|e| TaskError::failed(format!("invalid relay response: {}", e)))?;

        let limit = self.settings.max_output_bytes;
        Ok(TaskOutput::Process {
            stdout: capped_text(body.stdout.as_bytes(), limit),
            stderr: capped_text(body.stderr.as_bytes(), limit),
            exit_code: body.exit_code,
        })
    }
}

#[async_trait]
impl TaskImplementation for ProcessTask {
    async fn execute(
        &self,
        task: &TaskDefinition,
        context: &ExecutionContext,
    ) -> Result<TaskOutput, TaskError> {
        let TaskKind::Process { command, cwd } = &task.kind else {
            return Err(TaskError::InvalidConfig(format!(
                "task '{}' is not a process task",
                task.id
            )));
        };

        let request = ProcessRequest {
            kind: "process",
            command: command.clone(),
            cwd: cwd.clone(),
            env: context.environment.clone(),
            timeout_ms: context.timeout.map(|t| t.as_millis() as u64),
        };

        info!("Executing process task: {} - {}", task.id, command);

        let output = match &self.settings.process_backend {
            ProcessBackend::Relay { endpoint } => self.run_relay(endpoint, &request).await?,
            ProcessBackend::Local { relay_fallback } => {
                // A bad cwd is reported as NotFound too; keep it from reaching the relay
                if let Some(ref dir) = request.cwd {
                    if !Path::new(dir).is_dir() {
                        return Err(TaskError::failed(format!(
                            "working directory '{}' does not exist",
                            dir
                        )));
                    }
                }

                match (self.spawn_local(&request), relay_fallback) {
                    (Ok(child), _) => self
                        .collect(child)
                        .await
                        .map_err(|e| TaskError::failed(format!("failed to collect output: {}", e)))?,
                    (Err(e), Some(endpoint)) if is_unavailable(&e) => {
                        warn!(
                            "Local process execution unavailable ({}), using relay {}",
                            e, endpoint
                        );
                        self.run_relay(endpoint, &request).await?
                    }
                    (Err(e), _) => {
                        return Err(TaskError::failed(format!(
                            "failed to spawn '{}': {}",
                            self.settings.shell, e
                        )))
                    }
                }
            }
        };

        let exit_code = match &output {
            TaskOutput::Process { exit_code, .. } => *exit_code,
            _ => 0,
        };
        if exit_code != 0 {
            return Err(TaskError::with_output(
                format!("command exited with code {}", exit_code),
                output,
            ));
        }

        Ok(output)
    }

    fn kind(&self) -> &'static str {
        "process"
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), TaskError> {
        match &task.kind {
            TaskKind::Process { command, .. } if !command.trim().is_empty() => Ok(()),
            TaskKind::Process { .. } => Err(TaskError::InvalidConfig(
                "command cannot be empty".to_string(),
            )),
            other => Err(TaskError::InvalidConfig(format!(
                "expected a process task, found '{}'",
                other
            ))),
        }
    }
}

/// Kills the child's process group on drop unless disarmed
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) => debug!("Killed process group {}", pgid),
        Err(e) => debug!("Process group {} already gone: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

/// Spawn failures that mean the host cannot run processes at all
fn is_unavailable(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::Unsupported
    )
}

/// Read up to `limit` bytes, then drain the rest so the child never blocks on a full pipe
async fn read_capped<R>(reader: Option<R>, limit: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };

    let mut buffer = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buffer).await?;
    let discarded = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;

    Ok((buffer, discarded > 0))
}
