//! Static-analysis checks over changed files.
//!
//! Files are grouped by category using their extension, then every available
//! provider for each category runs in table order. A provider whose program
//! is missing is skipped; a failing provider never stops the ones after it.

pub mod explain;
pub mod providers;

use crate::core::executor::{CommandOutput, ExecuteOptions, Executor};
use providers::{CheckProvider, Scope, Verdict, BUILTIN_PROVIDERS};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Default deadline for a single check invocation.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(300);

/// Default number of files passed to one batch invocation. Keeps the
/// argument list well under the platform limit.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Language category used to pick providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Go sources.
    Go,
    /// Rust sources.
    Rust,
    /// Dart and Flutter sources.
    Dart,
    /// Shell scripts.
    Shell,
    /// JavaScript and TypeScript sources.
    JavaScript,
    /// Python sources.
    Python,
}

impl FileCategory {
    /// All categories, in run order.
    pub const ALL: [Self; 6] = [
        Self::Go,
        Self::Rust,
        Self::Dart,
        Self::Shell,
        Self::JavaScript,
        Self::Python,
    ];

    /// Classifies a path by its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "go" => Some(Self::Go),
            "rs" => Some(Self::Rust),
            "dart" => Some(Self::Dart),
            "sh" | "bash" => Some(Self::Shell),
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "py" | "pyi" => Some(Self::Python),
            _ => None,
        }
    }
}

/// Severity of a check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The check passed.
    Info,
    /// The check failed.
    Error,
}

/// Outcome of one provider invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Provider name.
    pub tool: String,
    /// File the result refers to, for per-file providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// First reported line, when the tool emits locations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// First reported column, when the tool emits locations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// Severity of the result.
    pub severity: Severity,
    /// Human-readable summary.
    pub message: String,
    /// Whether the check passed.
    pub success: bool,
    /// Raw tool output, on failure.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
    /// Error descriptions, on failure.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CheckResult {
    fn passed(provider: &CheckProvider) -> Self {
        Self {
            tool: provider.tool.to_string(),
            file: None,
            line: None,
            column: None,
            severity: Severity::Info,
            message: provider.pass_message.to_string(),
            success: true,
            output: String::new(),
            errors: Vec::new(),
        }
    }

    fn failed(provider: &CheckProvider, message: String, output: String, errors: Vec<String>) -> Self {
        Self {
            severity: Severity::Error,
            message,
            success: false,
            output,
            errors,
            ..Self::passed(provider)
        }
    }
}

/// Returns true if every result passed. Vacuously true for no results.
#[must_use]
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.success)
}

/// Runs static-analysis providers over a set of files.
#[derive(Debug)]
pub struct CheckRunner {
    root: PathBuf,
    timeout: Duration,
    batch_size: usize,
    providers: Vec<CheckProvider>,
    executor: Executor,
}

impl CheckRunner {
    /// Creates a runner with the built-in providers, rooted at `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_providers(root, BUILTIN_PROVIDERS.to_vec())
    }

    /// Creates a runner with a custom provider table.
    #[must_use]
    pub fn with_providers(root: impl AsRef<Path>, providers: Vec<CheckProvider>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            timeout: DEFAULT_CHECK_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            providers,
            executor: Executor::new(),
        }
    }

    /// Sets the per-invocation deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the most files passed to one batch invocation. Larger sets are
    /// split and produce one result per chunk.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Groups existing files by category. Relative paths are resolved
    /// against the root; missing and unrecognized files are dropped.
    #[must_use]
    pub fn classify<P: AsRef<Path>>(&self, files: &[P]) -> BTreeMap<FileCategory, Vec<PathBuf>> {
        let mut groups: BTreeMap<FileCategory, Vec<PathBuf>> = BTreeMap::new();

        for file in files {
            let path = file.as_ref();
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.root.join(path)
            };

            if !path.exists() {
                tracing::debug!(path = %path.display(), "Skipping missing file");
                continue;
            }

            if let Some(category) = FileCategory::from_path(&path) {
                groups.entry(category).or_default().push(path);
            }
        }

        groups
    }

    /// Runs every applicable provider and collects their results.
    pub async fn run<P: AsRef<Path> + Sync>(&self, files: &[P]) -> Vec<CheckResult> {
        let groups = self.classify(files);
        let mut results = Vec::new();

        for (category, paths) in &groups {
            for provider in self.providers.iter().filter(|p| p.category == *category) {
                if !provider.is_available() {
                    tracing::debug!(tool = provider.tool, "Check tool not installed, skipping");
                    continue;
                }

                match provider.scope {
                    Scope::Project => {
                        results.push(self.invoke(provider, &[]).await);
                    },
                    Scope::Batch => {
                        for chunk in paths.chunks(self.batch_size) {
                            results.push(self.invoke(provider, chunk).await);
                        }
                    },
                    Scope::PerFile => {
                        for path in paths {
                            let mut result = self.invoke(provider, std::slice::from_ref(path)).await;
                            result.file = Some(path.display().to_string());
                            if !result.success {
                                if let Some((line, column)) = first_location(&result.output) {
                                    result.line = Some(line);
                                    result.column = Some(column);
                                }
                            }
                            results.push(result);
                        }
                    },
                }
            }
        }

        results
    }

    /// Runs one provider invocation and judges the outcome.
    async fn invoke(&self, provider: &CheckProvider, files: &[PathBuf]) -> CheckResult {
        let args = provider
            .args
            .iter()
            .map(|arg| std::ffi::OsStr::new(*arg))
            .chain(files.iter().map(|f| f.as_os_str()));
        let options = ExecuteOptions::default().cwd(&self.root).timeout(self.timeout);

        tracing::info!(tool = provider.tool, files = files.len(), "Running check");

        let output = match self.executor.execute_program(provider.program, args, options).await {
            Ok(output) => output,
            Err(e) => {
                let message = e.to_string();
                return CheckResult::failed(
                    provider,
                    provider.fail_message.to_string(),
                    message.clone(),
                    vec![message],
                );
            },
        };

        if output.timed_out {
            let message = format!(
                "{} timed out after {}",
                provider.tool,
                humantime::format_duration(self.timeout)
            );
            return CheckResult::failed(provider, message.clone(), String::new(), vec![message]);
        }

        judge(provider, &output)
    }
}

/// Applies the provider's verdict rule to a finished command.
fn judge(provider: &CheckProvider, output: &CommandOutput) -> CheckResult {
    match provider.verdict {
        Verdict::ExitStatus => {
            if output.success() {
                return CheckResult::passed(provider);
            }
            let text = output.combined_output();
            let errors = non_empty(&text);
            CheckResult::failed(provider, provider.fail_message.to_string(), text, errors)
        },
        Verdict::SilentOutput => {
            let listed = output.stdout.trim();
            if output.success() && listed.is_empty() {
                return CheckResult::passed(provider);
            }
            let (text, errors) = if listed.is_empty() {
                let text = output.combined_output();
                let errors = non_empty(&text);
                (text, errors)
            } else {
                (listed.to_string(), vec![format!("Files not formatted:\n{listed}")])
            };
            CheckResult::failed(provider, provider.fail_message.to_string(), text, errors)
        },
    }
}

fn non_empty(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

/// Finds the first `file:line:column:` location in tool output.
fn first_location(output: &str) -> Option<(u32, u32)> {
    static LOCATION: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = LOCATION
        .get_or_init(|| Regex::new(r"^(.+?):(\d+):(\d+):").ok())
        .as_ref()?;

    output.lines().find_map(|line| {
        let caps = pattern.captures(line)?;
        let line_no = caps.get(2)?.as_str().parse().ok()?;
        let column = caps.get(3)?.as_str().parse().ok()?;
        Some((line_no, column))
    })
}
