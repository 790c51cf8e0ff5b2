// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for conductor

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(about = "A workflow orchestration engine for dependency-ordered YAML workflows")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, global = true, help = "Log format (pretty, compact, json)")]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a workflow from a YAML file
    Run {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,

        #[arg(
            short,
            long = "env",
            help = "Set workflow environment variables (key=value)"
        )]
        env: Vec<String>,

        #[arg(long, help = "Maximum number of tasks started per round")]
        max_parallel: Option<usize>,

        #[arg(short, long, help = "Write the execution report to a file")]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate a workflow file without executing
    Validate {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,
    },

    /// Initialize a new workflow file
    Init {
        #[arg(help = "Name of the workflow to create")]
        name: String,

        #[arg(short, long, help = "Output directory", default_value = ".")]
        output_dir: PathBuf,
    },

    /// List scheduled workflow jobs and routines
    Jobs {
        #[arg(short, long, help = "Path to schedule file")]
        schedule: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Run one scheduled job immediately
    Trigger {
        #[arg(help = "Job id, or the workflow name for workflow jobs")]
        job: String,

        #[arg(short, long, help = "Path to schedule file")]
        schedule: PathBuf,
    },

    /// Run the scheduler until interrupted
    Serve {
        #[arg(short, long, help = "Path to schedule file")]
        schedule: PathBuf,

        #[arg(long, value_parser = humantime::parse_duration, help = "Scheduler tick interval (e.g. 30s)")]
        tick: Option<std::time::Duration>,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse variables from key=value format
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<HashMap<String, String>> {
        let mut variables = HashMap::new();

        for var in vars {
            if let Some((key, value)) = var.split_once('=') {
                if key.is_empty() {
                    return Err(anyhow::anyhow!("Variable name cannot be empty in '{}'", var));
                }
                variables.insert(key.to_string(), value.to_string());
            } else {
                return Err(anyhow::anyhow!(
                    "Invalid variable format '{}'. Expected 'key=value'",
                    var
                ));
            }
        }

        Ok(variables)
    }
}
