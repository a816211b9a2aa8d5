//! CLI command implementations.

use super::runtime;
use crate::checks::{explain, CheckResult};
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::git::GitRepo;
use crate::core::runner::TestResult;
use crate::core::validate::{ValidationVerdict, Validator};
use crate::mcp::{self, tools::builtin_registry};
use console::style;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Serve the tool protocol on stdin/stdout until stdin closes.
pub fn serve() -> Result<ExitCode> {
    let registry = builtin_registry();
    tracing::info!(version = crate::VERSION, "Starting git-guardian");

    runtime()?.block_on(mcp::serve_stdio(&registry))?;
    Ok(ExitCode::SUCCESS)
}

/// Validate unpushed commits. The config path and the tests' working
/// directory are both relative to `repo_path`.
pub fn validate(
    repo_path: &Path,
    remote: &str,
    branch: Option<&str>,
    config: &str,
    json: bool,
) -> Result<ExitCode> {
    let repo = GitRepo::discover_from(repo_path)?;
    let config_path = Config::resolve_path(repo_path, config);

    let verdict = runtime()?.block_on(
        Validator::new(&repo)
            .test_dir(repo_path)
            .validate(remote, branch, &config_path),
    )?;

    if json {
        let text = serde_json::to_string_pretty(&verdict)
            .map_err(|e| Error::json("encode verdict", e))?;
        println!("{text}");
    } else {
        print_verdict(&verdict);
    }

    Ok(if verdict.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print a human-readable verdict to stderr.
fn print_verdict(verdict: &ValidationVerdict) {
    if let Some(message) = &verdict.message {
        eprintln!("{} {message}", style("✓").green());
        return;
    }

    eprintln!(
        "{} {} unpushed commit(s), {} changed file(s)",
        style("•").cyan(),
        verdict.commits,
        verdict.changed_files
    );

    if !verdict.checks.is_empty() {
        eprintln!("\n{}", style("Checks").bold());
        for check in &verdict.checks {
            print_check(check);
        }
    }

    if let Some(error) = &verdict.test_config_error {
        eprintln!("\n{} Tests skipped: {error}", style("!").yellow());
    } else if !verdict.tests.is_empty() {
        eprintln!("\n{}", style("Tests").bold());
        for test in &verdict.tests {
            print_test(test);
        }
    }

    eprintln!();
    if verdict.success {
        eprintln!("{} Push allowed", style("✓").green().bold());
    } else {
        eprintln!("{} Push blocked", style("✗").red().bold());
    }
}

fn print_check(check: &CheckResult) {
    let mark = if check.success {
        style("✓").green()
    } else {
        style("✗").red()
    };
    match &check.file {
        Some(file) => eprintln!("  {mark} {} {}: {}", check.tool, style(file).dim(), check.message),
        None => eprintln!("  {mark} {}: {}", check.tool, check.message),
    }
    if !check.success {
        for error in &check.errors {
            eprintln!("      {}", style(error).dim());
        }
    }
}

fn print_test(test: &TestResult) {
    let mark = match (test.success, test.blocking) {
        (true, _) => style("✓").green(),
        (false, true) => style("✗").red(),
        (false, false) => style("!").yellow(),
    };
    let kind = if test.blocking { "" } else { " (non-blocking)" };
    eprintln!("  {mark} {}{kind} {}", test.name, style(format!("{:.2}s", test.duration)).dim());
    if let Some(error) = &test.error {
        eprintln!("      {}", style(error).dim());
    }
}

/// Validate the test configuration.
pub fn check_config(path: &Path) -> Result<ExitCode> {
    let config = Config::load_from(path)?;
    config.validate()?;

    eprintln!(
        "{} Configuration is valid: {}",
        style("✓").green(),
        path.display()
    );
    for test in &config.tests {
        let kind = if test.blocking { "blocking" } else { "non-blocking" };
        eprintln!(
            "  {} {} ({kind}, {})",
            style("•").cyan(),
            test.name,
            humantime::format_duration(test.timeout_duration())
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Write a starter test configuration.
pub fn init(force: bool) -> Result<ExitCode> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            config_path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::write(&config_path, Config::default_yaml())
        .map_err(|e| Error::io("write config", e))?;

    eprintln!("{} Created {}", style("✓").green(), config_path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Replace the starter tests in {CONFIG_FILE_NAME} with your own");
    eprintln!("  2. Run: git-guardian check-config");

    Ok(ExitCode::SUCCESS)
}

/// Print the explanation for a failure type.
pub fn explain(failure_type: &str, details: Option<&str>) -> Result<ExitCode> {
    println!("{}", explain::explain(failure_type, details.unwrap_or_default()));
    Ok(ExitCode::SUCCESS)
}

/// Print the version.
pub fn version() -> Result<ExitCode> {
    println!("git-guardian v{}", crate::VERSION);
    Ok(ExitCode::SUCCESS)
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    let mut cmd = super::Cli::command();
    clap_complete::generate(shell, &mut cmd, "git-guardian", &mut std::io::stdout());
}
