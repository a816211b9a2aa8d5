//! The git-guardian tools.
//!
//! Every handler takes the raw `arguments` object of a `tools/call` and
//! returns a JSON value. Omitted or empty string arguments take their
//! defaults: repository `.`, remote `origin`, the current branch, and the
//! `.mcp.yml` test configuration. Relative paths are resolved against the
//! repository path.

use super::registry::ToolRegistry;
use crate::checks::{all_passed, explain, CheckRunner};
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::git::{CommitLister, GitRepo};
use crate::core::runner::TestRunner;
use crate::core::validate::Validator;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Default remote name.
pub const DEFAULT_REMOTE: &str = "origin";

/// Default repository path.
pub const DEFAULT_REPO_PATH: &str = ".";

/// Builds the registry of built-in tools.
#[must_use]
pub fn builtin_registry() -> ToolRegistry {
    ToolRegistry::builder()
        .tool(
            "analyze_commits",
            "List unpushed commits and the files they change",
            analyze_commits,
        )
        .tool(
            "run_checks",
            "Run static analysis checks on the given files",
            run_checks,
        )
        .tool(
            "run_tests",
            "Run the configured test suite",
            run_tests,
        )
        .tool(
            "explain_failure",
            "Explain a failed check or test and how to fix it",
            explain_failure,
        )
        .tool(
            "validate_push",
            "Run checks and tests on unpushed commits and decide whether the push may proceed",
            validate_push,
        )
        .build()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalyzeCommitsArgs {
    repo_path: Option<String>,
    remote: Option<String>,
    branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RunChecksArgs {
    repo_path: Option<String>,
    files: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RunTestsArgs {
    repo_path: Option<String>,
    config_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExplainFailureArgs {
    failure_type: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValidatePushArgs {
    repo_path: Option<String>,
    remote: Option<String>,
    branch: Option<String>,
    config_path: Option<String>,
}

/// Lists unpushed commits with their changed files.
pub async fn analyze_commits(args: Value) -> Result<Value> {
    let args: AnalyzeCommitsArgs = parse_args(args)?;
    let repo = GitRepo::discover_from(&repo_dir(args.repo_path.as_deref()))?;

    let branch = match given(args.branch.as_deref()) {
        Some(branch) => branch.to_string(),
        None => repo.current_branch()?,
    };
    let remote = given(args.remote.as_deref()).unwrap_or(DEFAULT_REMOTE);

    let commits = repo.unpushed_commits(remote, &branch)?;
    let changed_files: Vec<String> = repo
        .changed_files(&commits)
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    Ok(json!({
        "success": true,
        "total_commits": commits.len(),
        "commits": commits,
        "changed_files": changed_files,
    }))
}

/// Runs static-analysis checks over the given files.
pub async fn run_checks(args: Value) -> Result<Value> {
    let args: RunChecksArgs = parse_args(args)?;
    let root = existing_dir(args.repo_path.as_deref())?;

    let results = CheckRunner::new(&root).run(&args.files).await;
    Ok(json!({
        "success": all_passed(&results),
        "results": to_value(&results)?,
    }))
}

/// Runs the configured test suite.
pub async fn run_tests(args: Value) -> Result<Value> {
    let args: RunTestsArgs = parse_args(args)?;
    let root = existing_dir(args.repo_path.as_deref())?;
    let config = Config::load_from(&config_file(&root, args.config_path.as_deref()))?;

    let run = TestRunner::new(&root).run(&config.tests).await;
    Ok(json!({
        "success": run.success(),
        "results": to_value(&run.results)?,
    }))
}

/// Explains a failure type.
pub async fn explain_failure(args: Value) -> Result<Value> {
    let args: ExplainFailureArgs = parse_args(args)?;
    let explanation = explain::explain(&args.failure_type, args.details.as_deref().unwrap_or_default());
    Ok(json!({
        "success": true,
        "explanation": explanation,
    }))
}

/// Validates unpushed commits before a push.
pub async fn validate_push(args: Value) -> Result<Value> {
    let args: ValidatePushArgs = parse_args(args)?;
    let dir = repo_dir(args.repo_path.as_deref());
    let repo = GitRepo::discover_from(&dir)?;
    let config = config_file(&dir, args.config_path.as_deref());
    let remote = given(args.remote.as_deref()).unwrap_or(DEFAULT_REMOTE);

    let verdict = Validator::new(&repo)
        .test_dir(&dir)
        .validate(remote, given(args.branch.as_deref()), &config)
        .await?;
    to_value(&verdict)
}

/// Decodes tool arguments.
fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::invalid_params(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::json("encode tool result", e))
}

/// Treats empty strings as omitted.
fn given(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn repo_dir(repo_path: Option<&str>) -> PathBuf {
    PathBuf::from(given(repo_path).unwrap_or(DEFAULT_REPO_PATH))
}

fn existing_dir(repo_path: Option<&str>) -> Result<PathBuf> {
    let dir = repo_dir(repo_path);
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(Error::invalid_params(format!(
            "repo_path is not a directory: {}",
            dir.display()
        )))
    }
}

fn config_file(root: &Path, config_path: Option<&str>) -> PathBuf {
    Config::resolve_path(root, given(config_path).unwrap_or(CONFIG_FILE_NAME))
}
