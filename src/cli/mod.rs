//! Command-line interface for git-guardian.
//!
//! This module provides the `git-guardian` CLI with subcommands for:
//! - `serve`: Run the tool protocol server on stdin/stdout (the default)
//! - `validate`: Validate unpushed commits, for use from a `pre-push` hook
//! - `check-config`: Validate the test configuration
//! - `init`: Write a starter test configuration
//! - `explain`: Explain a failure type
//! - `version`: Print the version

mod commands;

use crate::config::CONFIG_FILE_NAME;
use crate::core::error::{Error, Result};
use crate::mcp::tools::{DEFAULT_REMOTE, DEFAULT_REPO_PATH};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Pre-push validation agent for editors and AI coding agents.
#[derive(Debug, Parser)]
#[command(
    name = "git-guardian",
    author,
    version,
    about = "Pre-push validation agent for editors and AI coding agents",
    long_about = r#"
git-guardian inspects unpushed commits, runs static analysis on the files
they touch, runs the configured test suite, and reports one verdict.

Without a subcommand it serves the tools analyze_commits, run_checks,
run_tests, explain_failure and validate_push as line-delimited JSON-RPC
on stdin/stdout. Logs go to stderr, or to --log-file.

Quick start:
  git-guardian init       # Create .mcp.yml with a starter test suite
  git-guardian validate   # Validate unpushed commits from a terminal or hook

Environment variables:
  RUST_LOG=debug          Override the log filter
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the tool protocol on stdin/stdout.
    Serve,

    /// Validate unpushed commits and exit non-zero if the push should be blocked.
    #[command(visible_alias = "v")]
    Validate {
        /// Repository path.
        #[arg(long, default_value = DEFAULT_REPO_PATH)]
        repo: PathBuf,

        /// Remote to compare against.
        #[arg(long, default_value = DEFAULT_REMOTE)]
        remote: String,

        /// Branch to compare (defaults to the current branch).
        #[arg(long)]
        branch: Option<String>,

        /// Test configuration, relative to the repository.
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: String,

        /// Print the verdict as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Validate the test configuration file.
    CheckConfig {
        /// Configuration file.
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
    },

    /// Write a starter test configuration.
    #[command(visible_alias = "i")]
    Init {
        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,
    },

    /// Explain a failure type and how to fix it.
    Explain {
        /// Failure type, such as `gofmt` or `test`.
        failure_type: String,

        /// Failure details to append.
        #[arg(short, long)]
        details: Option<String>,
    },

    /// Print the version.
    Version,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    // Set up color
    setup_color(cli.color);

    // Without a subcommand, serve the protocol
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve(),
        Commands::Validate {
            repo,
            remote,
            branch,
            config,
            json,
        } => commands::validate(&repo, &remote, branch.as_deref(), &config, json),
        Commands::CheckConfig { config } => commands::check_config(&config),
        Commands::Init { force } => commands::init(force),
        Commands::Explain {
            failure_type,
            details,
        } => commands::explain(&failure_type, details.as_deref()),
        Commands::Version => commands::version(),
        Commands::Completions { shell } => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Builds the single-threaded runtime used by async subcommands.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create runtime: {e}"),
        })
}

/// Sets up logging based on verbosity flags.
///
/// Stdout carries protocol traffic, so logs never go there.
fn setup_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::io(format!("open log file {}", path.display()), e))?;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        },
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        },
    }

    Ok(())
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
