//! Concord - durable workflows and governed multi-agent orchestration
//!
//! Main entry point for the Concord CLI.

mod adapters;
mod cli;
mod cmd_task;
mod cmd_workflow;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use concord_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig, default_config_path};

use crate::cli::{Cli, Commands};
use crate::cmd_task::TaskOptions;

/// Initialize tracing with console and optional file output.
///
/// Console output goes to stderr so command output on stdout stays parseable.
/// Log files are written to `logging.log_dir` with daily rotation.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = if logging.file {
        let log_dir = logging.resolved_dir();
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("concord")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Flushes pending lines when the process exits
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(true),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// An explicit `--config` must exist; the default location may be absent.
fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, Config), Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok((path.to_path_buf(), ConfigLoader::load(path)?)),
        None => {
            let path = default_config_path().unwrap_or_else(|| PathBuf::from("concord.toml"));
            let config = ConfigLoader::load_or_default(&path)?;
            Ok((path, config))
        }
    }
}

/// Print every validation finding; fail on errors.
fn validate(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!(
            "Configuration {} is valid ({} warning(s)).",
            path.display(),
            result.warnings.len()
        );
        Ok(())
    } else {
        Err(format!("configuration has {} error(s)", result.errors.len()).into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config_path, config) = load_config(cli.config.as_deref())?;

    if matches!(cli.command, Commands::Validate) {
        return validate(&config_path, &config);
    }

    ConfigValidator::ensure_valid(&config)?;
    init_tracing(&config.logging)?;
    debug!(path = %config_path.display(), "Configuration loaded");

    match cli.command {
        Commands::Validate => Ok(()),
        Commands::RunDemo { id, fail_middle } => cmd_workflow::run_demo(&config, id, fail_middle).await,
        Commands::ResumeDemo { workflow_id } => cmd_workflow::resume_demo(&config, &workflow_id).await,
        Commands::Checkpoints { workflow_id } => cmd_workflow::list_checkpoints(&config, &workflow_id).await,
        Commands::Purge { workflow_id } => cmd_workflow::purge(&config, &workflow_id).await,
        Commands::Task {
            pattern,
            goal,
            agents,
            autonomy,
            user,
            context,
            approve,
            converge_after,
        } => {
            info!(goal = %goal, "Running task");
            let options = TaskOptions {
                pattern: pattern.into(),
                goal,
                agents,
                autonomy: autonomy.into(),
                user,
                context,
                approve,
                converge_after,
            };
            cmd_task::run_task(&config, options).await
        }
    }
}
