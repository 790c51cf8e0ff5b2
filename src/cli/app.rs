// ABOUTME: Main application orchestration for conductor CLI
// ABOUTME: Coordinates between CLI arguments, configuration, and command execution

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Commands, Config};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level = if verbose {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let installed = match self.config.logging.format.as_str() {
            "json" => tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .with_current_span(true)
                .with_writer(std::io::stderr)
                .try_init(),
            "compact" => tracing_subscriber::fmt()
                .compact()
                .with_env_filter(env_filter)
                .with_ansi(!no_color)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(!no_color)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&mut self, args: Args) -> Result<()> {
        if let Some(ref format) = args.log_format {
            self.config.logging.format = format.clone();
        }
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting conductor v{}", env!("CARGO_PKG_VERSION"));
        debug!("Configuration: {:?}", self.config);

        match args.command {
            Commands::Run {
                workflow,
                env,
                max_parallel,
                output,
                format,
            } => {
                commands::run_workflow(workflow, env, max_parallel, output, format, &self.config)
                    .await
            }

            Commands::Validate { workflow } => {
                commands::validate_workflow(workflow, &self.config).await
            }

            Commands::Init { name, output_dir } => {
                commands::init_workflow(name, output_dir).await.map(|_| ())
            }

            Commands::Jobs { schedule, format } => {
                commands::list_jobs(schedule, format, &self.config).await
            }

            Commands::Trigger { job, schedule } => {
                commands::trigger_job(job, schedule, &self.config).await
            }

            Commands::Serve { schedule, tick } => {
                commands::serve(schedule, tick, &self.config).await
            }
        }
    }

    /// Parse arguments, load configuration and run
    pub async fn from_env() -> Result<()> {
        let args = Args::parse_args();
        let config = Config::load(args.config.clone())?;
        Self::new(config).run(args).await
    }
}
