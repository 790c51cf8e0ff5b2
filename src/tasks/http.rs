// ABOUTME: HTTP task implementation issuing a single request with reqwest
// ABOUTME: Captures status, headers and a capped body; non-2xx responses fail the task

use async_trait::async_trait;
use reqwest::Method;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{capture_text, TaskImplementation};
use crate::engine::error::TaskError;
use crate::engine::{ExecutionContext, TaskOutput};
use crate::parser::{TaskDefinition, TaskKind};

pub struct HttpTask {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpTask {
    pub fn new(client: reqwest::Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }
}

fn parse_method(method: &str) -> Result<Method, TaskError> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| TaskError::InvalidConfig(format!("invalid HTTP method '{}'", method)))
}

#[async_trait]
impl TaskImplementation for HttpTask {
    async fn execute(
        &self,
        task: &TaskDefinition,
        _context: &ExecutionContext,
    ) -> Result<TaskOutput, TaskError> {
        let TaskKind::Http {
            url,
            method,
            headers,
            body,
        } = &task.kind
        else {
            return Err(TaskError::InvalidConfig(format!(
                "task '{}' is not an http task",
                task.id
            )));
        };

        let method = parse_method(method)?;
        info!("Executing http task: {} - {} {}", task.id, method, url);

        let mut request = self.client.request(method, url.as_str());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body.clone());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| TaskError::failed(format!("request failed: {}", e)))?;

        let status = response.status();
        let response_headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        let mut buffer = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TaskError::failed(format!("failed to read response body: {}", e)))?
        {
            let room = self.max_body_bytes.saturating_sub(buffer.len());
            if chunk.len() > room {
                buffer.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            buffer.extend_from_slice(&chunk);
        }

        debug!("Task {} received status {}", task.id, status);

        let output = TaskOutput::Http {
            status: status.as_u16(),
            body: capture_text(&buffer, truncated),
            headers: response_headers,
        };

        if !status.is_success() {
            return Err(TaskError::with_output(
                format!("request returned status {}", status),
                output,
            ));
        }

        Ok(output)
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    fn validate(&self, task: &TaskDefinition) -> Result<(), TaskError> {
        let TaskKind::Http { url, method, .. } = &task.kind else {
            return Err(TaskError::InvalidConfig(format!(
                "expected an http task, found '{}'",
                task.kind
            )));
        };

        parse_method(method)?;
        let parsed = url::Url::parse(url)
            .map_err(|e| TaskError::InvalidConfig(format!("invalid url '{}': {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(TaskError::InvalidConfig(format!(
                "unsupported url scheme '{}'",
                scheme
            ))),
        }
    }
}
