//! blessed CLI
//!
//! Splits stylesheets that exceed the legacy selector limit into
//! `@import`-chained fragments.

mod commands;
mod files;

use anyhow::Result;
use blessed_core::config::{AppConfig, CliOverrides};
use blessed_core::logging::{self, LogFormat};
use clap::{Parser, Subcommand};
use commands::{CheckCommand, SplitCommand};
use std::path::PathBuf;

/// blessed - split stylesheets that exceed the selector limit
#[derive(Parser, Debug)]
#[command(name = "blessed")]
#[command(about = "Split stylesheets that exceed the selector limit", long_about = None)]
#[command(version)]
struct Cli {
    /// Working directory relative paths resolve against
    #[arg(short, long, global = true, env = "BLESSED_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: <workspace>/.blessed/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split stylesheets and write the fragments
    Split(SplitCommand),

    /// Report selector counts without writing anything
    Check(CheckCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(CliOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
    })?;
    config.validate()?;

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("blessed starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Split options: {:?}", config.split);

    let command_name = match &cli.command {
        Commands::Split(_) => "split",
        Commands::Check(_) => "check",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Split(cmd) => cmd.execute(&config).await,
        Commands::Check(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
