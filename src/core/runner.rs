//! Test runner for the configured test suite.
//!
//! Tests run one after another in configured order. Every test produces a
//! result, so a failing or timed-out test never hides the ones after it.

use crate::config::TestSpec;
use crate::core::error::Error;
use crate::core::executor::{CommandOutput, ExecuteOptions, Executor};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Result of running a single configured test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    /// Name of the test.
    pub name: String,
    /// Whether the test passed.
    pub success: bool,
    /// Copied from the test definition.
    pub blocking: bool,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    /// Combined stdout and stderr.
    pub output: String,
    /// Why the test failed: timeout, exit status, or launch error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    /// Creates a failed result that never reached the executor.
    fn not_run(spec: &TestSpec, error: impl Into<String>) -> Self {
        Self {
            name: spec.name.clone(),
            success: false,
            blocking: spec.blocking,
            duration: 0.0,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Returns true if this is a failed blocking test.
    #[must_use]
    pub const fn is_blocking_failure(&self) -> bool {
        self.blocking && !self.success
    }
}

/// Result of running a whole test suite.
#[derive(Debug, Clone, Default)]
pub struct TestRun {
    /// Individual test results, in configured order.
    pub results: Vec<TestResult>,
    /// Total duration.
    pub duration: Duration,
}

impl TestRun {
    /// Returns true if no blocking test failed.
    #[must_use]
    pub fn success(&self) -> bool {
        !has_blocking_failures(&self.results)
    }

    /// Returns the number of passed tests.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Returns the number of failed tests.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// Returns failed blocking test results.
    pub fn blocking_failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.is_blocking_failure())
    }
}

/// Returns true if any blocking test in `results` failed.
#[must_use]
pub fn has_blocking_failures(results: &[TestResult]) -> bool {
    results.iter().any(TestResult::is_blocking_failure)
}

/// Runner for executing configured tests.
#[derive(Debug)]
pub struct TestRunner {
    cwd: PathBuf,
    executor: Executor,
}

impl TestRunner {
    /// Creates a runner that executes tests in `cwd`.
    #[must_use]
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            executor: Executor::new(),
        }
    }

    /// Runs every test in order and collects one result per test.
    pub async fn run(&self, tests: &[TestSpec]) -> TestRun {
        let start = Instant::now();
        let mut results = Vec::with_capacity(tests.len());

        for spec in tests {
            let result = self.run_test(spec).await;
            if result.success {
                tracing::info!(test = %result.name, duration = result.duration, "Test passed");
            } else {
                tracing::info!(
                    test = %result.name,
                    blocking = result.blocking,
                    error = result.error.as_deref().unwrap_or_default(),
                    "Test failed"
                );
            }
            results.push(result);
        }

        let run = TestRun {
            results,
            duration: start.elapsed(),
        };
        tracing::info!(
            passed = run.passed_count(),
            failed = run.failed_count(),
            duration = ?run.duration,
            "Test run finished"
        );
        run
    }

    /// Runs a single test.
    pub async fn run_test(&self, spec: &TestSpec) -> TestResult {
        if spec.command.trim().is_empty() {
            return TestResult::not_run(spec, Error::EmptyCommand.to_string());
        }

        let timeout = spec.timeout_duration();
        let mut options = ExecuteOptions::default().cwd(&self.cwd).timeout(timeout);
        for (key, value) in &spec.env {
            options = options.env(key.clone(), value.clone());
        }

        let start = Instant::now();
        let outcome = self.executor.execute(&spec.command, options).await;
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            Ok(output) => TestResult {
                name: spec.name.clone(),
                success: output.success(),
                blocking: spec.blocking,
                duration: elapsed,
                error: failure_reason(&output, timeout),
                output: output.combined_output(),
            },
            Err(e) => TestResult {
                duration: elapsed,
                ..TestResult::not_run(spec, e.to_string())
            },
        }
    }
}

/// Describes why a finished command counts as a failure.
fn failure_reason(output: &CommandOutput, timeout: Duration) -> Option<String> {
    if output.timed_out {
        return Some(format!("test timed out after {} seconds", timeout.as_secs_f64()));
    }
    match output.exit_code {
        Some(0) => None,
        Some(code) => Some(format!("exit status {code}")),
        None => Some("terminated by signal".to_string()),
    }
}
