//! Pre-push validation.
//!
//! Combines commit inspection, static-analysis checks and the configured
//! test suite into one verdict. A push passes when no check fails and no
//! blocking test fails.

use crate::checks::{all_passed, CheckResult, CheckRunner};
use crate::config::Config;
use crate::core::error::Result;
use crate::core::git::CommitLister;
use crate::core::runner::{has_blocking_failures, TestResult, TestRunner};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Message reported when there is nothing to push.
pub const NOTHING_TO_VALIDATE: &str = "No unpushed commits to validate";

/// Combined outcome of a pre-push validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationVerdict {
    /// True when no check failed and no blocking test failed.
    pub success: bool,
    /// Explanation for short-circuited runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of unpushed commits.
    pub commits: usize,
    /// Number of distinct files touched by those commits.
    pub changed_files: usize,
    /// Static-analysis results.
    pub checks: Vec<CheckResult>,
    /// Test results, in configured order.
    pub tests: Vec<TestResult>,
    /// Why the test configuration could not be loaded, if it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_config_error: Option<String>,
}

impl ValidationVerdict {
    /// Verdict for a branch with nothing to push.
    #[must_use]
    pub fn nothing_to_validate() -> Self {
        Self {
            success: true,
            message: Some(NOTHING_TO_VALIDATE.to_string()),
            commits: 0,
            changed_files: 0,
            checks: Vec::new(),
            tests: Vec::new(),
            test_config_error: None,
        }
    }
}

/// Runs pre-push validation against a commit source.
#[derive(Debug)]
pub struct Validator<'a, L> {
    lister: &'a L,
    checks: CheckRunner,
    test_dir: PathBuf,
}

impl<'a, L: CommitLister + Sync> Validator<'a, L> {
    /// Creates a validator using the built-in check providers.
    #[must_use]
    pub fn new(lister: &'a L) -> Self {
        let checks = CheckRunner::new(lister.root());
        Self::with_check_runner(lister, checks)
    }

    /// Creates a validator with a custom check runner.
    #[must_use]
    pub fn with_check_runner(lister: &'a L, checks: CheckRunner) -> Self {
        Self {
            lister,
            checks,
            test_dir: lister.root().to_path_buf(),
        }
    }

    /// Sets the directory configured tests run in. Defaults to the
    /// repository root.
    #[must_use]
    pub fn test_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.test_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Validates the commits on `branch` that are not on `remote`.
    ///
    /// `branch` defaults to the current branch. A test configuration that
    /// fails to load does not fail validation; the verdict records the load
    /// error and carries check results only.
    pub async fn validate(
        &self,
        remote: &str,
        branch: Option<&str>,
        config_path: &Path,
    ) -> Result<ValidationVerdict> {
        let branch = match branch {
            Some(branch) => branch.to_string(),
            None => self.lister.current_branch()?,
        };

        let commits = self.lister.unpushed_commits(remote, &branch)?;
        if commits.is_empty() {
            tracing::info!(remote, branch = %branch, "No unpushed commits");
            return Ok(ValidationVerdict::nothing_to_validate());
        }

        let files = self.lister.changed_files(&commits);
        tracing::info!(
            commits = commits.len(),
            files = files.len(),
            "Validating unpushed commits"
        );

        let checks = self.checks.run(&files).await;

        let (tests, test_config_error) = match Config::load_from(config_path) {
            Ok(config) => {
                let run = TestRunner::new(&self.test_dir).run(&config.tests).await;
                (run.results, None)
            },
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Test configuration unavailable, continuing with checks only"
                );
                (Vec::new(), Some(e.to_string()))
            },
        };

        Ok(ValidationVerdict {
            success: all_passed(&checks) && !has_blocking_failures(&tests),
            message: None,
            commits: commits.len(),
            changed_files: files.len(),
            checks,
            tests,
            test_config_error,
        })
    }
}
