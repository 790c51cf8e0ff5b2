// ABOUTME: Output module for rendering engine results
// ABOUTME: Selects a formatter by format name and writes to stdout or files

pub mod error;
pub mod formatter;
pub mod writer;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use self::error::{OutputError, Result};
pub use self::formatter::{JsonFormatter, OutputFormatter, TextFormatter, YamlFormatter};
pub use self::writer::{FileWriter, OutputWriter, StdoutWriter};
use crate::engine::WorkflowExecution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
    #[default]
    Text,
}

impl OutputFormat {
    pub fn formatter(self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Json => Box::new(JsonFormatter::new_pretty()),
            OutputFormat::Yaml => Box::new(YamlFormatter),
            OutputFormat::Text => Box::new(TextFormatter::new()),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

pub fn render_execution(execution: &WorkflowExecution, format: OutputFormat) -> Result<String> {
    format.formatter().format_execution(execution)
}

/// Write to `path` when given, stdout otherwise
pub async fn emit(content: &str, path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(path) => FileWriter::new(path).write(content).await,
        None => StdoutWriter.write(content).await,
    }
}
