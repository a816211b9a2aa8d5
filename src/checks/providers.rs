//! Built-in static-analysis providers.
//!
//! Each provider is a row of data: which program to run for which file
//! category, how files are passed to it, and how its exit is judged. Adding
//! a linter means adding a row here.

use super::FileCategory;

/// How a provider receives the files it checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Runs once for the whole project, without file arguments.
    Project,
    /// Runs once with every file of the category appended.
    Batch,
    /// Runs once per file, producing one result per file.
    PerFile,
}

/// How a provider's outcome is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Passes on exit status zero.
    ExitStatus,
    /// Passes on exit status zero with nothing on stdout. Used by formatters
    /// that list offending files instead of failing.
    SilentOutput,
}

/// A static-analysis tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckProvider {
    /// Name reported in results.
    pub tool: &'static str,
    /// Category of files this provider applies to.
    pub category: FileCategory,
    /// Program to execute.
    pub program: &'static str,
    /// Fixed arguments placed before any file arguments.
    pub args: &'static [&'static str],
    /// How files are passed.
    pub scope: Scope,
    /// How the outcome is judged.
    pub verdict: Verdict,
    /// Commands that must also be on PATH for the provider to run.
    pub requires: &'static [&'static str],
    /// Message on success.
    pub pass_message: &'static str,
    /// Message on failure.
    pub fail_message: &'static str,
}

impl CheckProvider {
    /// Returns true if the program and every required command are on PATH.
    #[must_use]
    pub fn is_available(&self) -> bool {
        std::iter::once(self.program)
            .chain(self.requires.iter().copied())
            .all(crate::core::executor::Executor::command_exists)
    }
}

/// Providers run by default, grouped by category in run order.
pub const BUILTIN_PROVIDERS: &[CheckProvider] = &[
    CheckProvider {
        tool: "gofmt",
        category: FileCategory::Go,
        program: "gofmt",
        args: &["-l"],
        scope: Scope::Batch,
        verdict: Verdict::SilentOutput,
        requires: &["go"],
        pass_message: "All Go files properly formatted",
        fail_message: "Go formatting issues found",
    },
    CheckProvider {
        tool: "go vet",
        category: FileCategory::Go,
        program: "go",
        args: &["vet", "./..."],
        scope: Scope::Project,
        verdict: Verdict::ExitStatus,
        requires: &[],
        pass_message: "No issues found by go vet",
        fail_message: "Go vet found issues",
    },
    CheckProvider {
        tool: "golangci-lint",
        category: FileCategory::Go,
        program: "golangci-lint",
        args: &["run"],
        scope: Scope::Project,
        verdict: Verdict::ExitStatus,
        requires: &["go"],
        pass_message: "No linting issues found",
        fail_message: "Linter found issues",
    },
    CheckProvider {
        tool: "rustfmt",
        category: FileCategory::Rust,
        program: "rustfmt",
        args: &["--check", "--edition", "2021"],
        scope: Scope::Batch,
        verdict: Verdict::ExitStatus,
        requires: &[],
        pass_message: "All Rust files properly formatted",
        fail_message: "Rust formatting issues found",
    },
    CheckProvider {
        tool: "dart analyze",
        category: FileCategory::Dart,
        program: "dart",
        args: &["analyze"],
        scope: Scope::Project,
        verdict: Verdict::ExitStatus,
        requires: &[],
        pass_message: "No Dart issues found",
        fail_message: "Dart analysis found issues",
    },
    CheckProvider {
        tool: "flutter analyze",
        category: FileCategory::Dart,
        program: "flutter",
        args: &["analyze"],
        scope: Scope::Project,
        verdict: Verdict::ExitStatus,
        requires: &["dart"],
        pass_message: "No Flutter issues found",
        fail_message: "Flutter analysis found issues",
    },
    CheckProvider {
        tool: "shellcheck",
        category: FileCategory::Shell,
        program: "shellcheck",
        args: &["-f", "gcc"],
        scope: Scope::PerFile,
        verdict: Verdict::ExitStatus,
        requires: &[],
        pass_message: "No shell script issues",
        fail_message: "Shellcheck found issues",
    },
    CheckProvider {
        tool: "eslint",
        category: FileCategory::JavaScript,
        program: "eslint",
        args: &[],
        scope: Scope::Batch,
        verdict: Verdict::ExitStatus,
        requires: &[],
        pass_message: "No ESLint issues found",
        fail_message: "ESLint found issues",
    },
    CheckProvider {
        tool: "ruff",
        category: FileCategory::Python,
        program: "ruff",
        args: &["check", "--output-format", "concise"],
        scope: Scope::Batch,
        verdict: Verdict::ExitStatus,
        requires: &[],
        pass_message: "No Python issues found",
        fail_message: "Ruff found issues",
    },
];
