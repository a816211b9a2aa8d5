//! Test suite configuration for git-guardian.
//!
//! The configuration lists the test commands to run before a push. It is
//! read from `.mcp.yml` by default; files ending in `.toml` are parsed as
//! TOML instead.
//!
//! ```yaml
//! tests:
//!   - name: unit
//!     command: go test ./...
//!     blocking: true
//!     timeout: 120
//!   - name: lint-optional
//!     command: make lint
//!     timeout: 5m
//! ```

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".mcp.yml";

/// Timeout applied when a test leaves it unset or zero.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 300;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tests to run, in execution order.
    pub tests: Vec<TestSpec>,
}

/// A single configured test command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSpec {
    /// Name, unique within a configuration.
    pub name: String,
    /// Command line run through the shell.
    pub command: String,
    /// Whether a failure of this test blocks the push.
    pub blocking: bool,
    /// Deadline for the command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutSetting>,
    /// Extra environment variables for the command.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// A timeout as written in the configuration file.
///
/// Numbers are seconds and may be fractional; strings use humantime syntax
/// such as `"90s"` or `"5m"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    /// Whole seconds.
    Seconds(i64),
    /// Fractional seconds, such as `1.5`.
    Fractional(f64),
    /// Humantime duration string.
    Human(String),
}

impl TestSpec {
    /// Creates a test definition with the default timeout.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>, blocking: bool) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            blocking,
            timeout: Some(TimeoutSetting::Seconds(DEFAULT_TEST_TIMEOUT_SECS as i64)),
            env: BTreeMap::new(),
        }
    }

    /// Sets the timeout in whole seconds.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: i64) -> Self {
        self.timeout = Some(TimeoutSetting::Seconds(secs));
        self
    }

    /// Returns the effective deadline for this test.
    ///
    /// Unset, zero, negative and unparseable values fall back to the default.
    #[must_use]
    pub fn timeout_duration(&self) -> Duration {
        let fallback = Duration::from_secs(DEFAULT_TEST_TIMEOUT_SECS);
        match &self.timeout {
            Some(TimeoutSetting::Seconds(secs)) if *secs > 0 => {
                Duration::from_secs(secs.unsigned_abs())
            },
            Some(TimeoutSetting::Fractional(secs)) if *secs > 0.0 => {
                Duration::try_from_secs_f64(*secs).unwrap_or(fallback)
            },
            Some(TimeoutSetting::Human(text)) => match humantime::parse_duration(text) {
                Ok(duration) if !duration.is_zero() => duration,
                _ => {
                    tracing::warn!(
                        test = %self.name,
                        timeout = %text,
                        default_secs = DEFAULT_TEST_TIMEOUT_SECS,
                        "Invalid timeout format, using default"
                    );
                    fallback
                },
            },
            _ => fallback,
        }
    }
}

impl Config {
    /// Loads configuration from a specific path.
    ///
    /// Tests without a timeout, or with a timeout of zero, receive the
    /// default. Loading does not reject empty commands; the test runner
    /// reports those per test. Use [`Config::validate`] for strict checking.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;
        let mut config = Self::parse(&content, is_toml(path))?;
        config.apply_defaults();

        tracing::debug!(path = %path.display(), tests = config.tests.len(), "Loaded test configuration");
        Ok(config)
    }

    /// Parses configuration text as YAML or TOML.
    pub fn parse(content: &str, toml_format: bool) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if toml_format {
            toml::from_str(content)
                .map_err(|e| Error::config_parse_with_source("Failed to parse TOML", e))
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| Error::config_parse_with_source("Failed to parse YAML", e))
        }
    }

    /// Resolves a configuration path against the repository root.
    #[must_use]
    pub fn resolve_path(repo_root: &Path, config_path: &str) -> PathBuf {
        let path = Path::new(config_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            repo_root.join(path)
        }
    }

    /// Fills in default timeouts.
    fn apply_defaults(&mut self) {
        for test in &mut self.tests {
            let unset = match test.timeout {
                None | Some(TimeoutSetting::Seconds(0)) => true,
                Some(TimeoutSetting::Fractional(secs)) => secs.abs() < f64::EPSILON,
                _ => false,
            };
            if unset {
                test.timeout = Some(TimeoutSetting::Seconds(DEFAULT_TEST_TIMEOUT_SECS as i64));
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.tests.is_empty() {
            return Err(Error::config_invalid("tests", "no tests configured"));
        }

        let mut seen = HashSet::new();
        for (index, test) in self.tests.iter().enumerate() {
            let field = |name: &str| format!("tests[{index}].{name}");

            if test.name.trim().is_empty() {
                return Err(Error::config_invalid(field("name"), "test name cannot be empty"));
            }
            if !seen.insert(test.name.as_str()) {
                return Err(Error::config_invalid(
                    field("name"),
                    format!("duplicate test name '{}'", test.name),
                ));
            }
            if test.command.trim().is_empty() {
                return Err(Error::config_invalid(
                    field("command"),
                    format!("test command cannot be empty for test '{}'", test.name),
                ));
            }
            match &test.timeout {
                Some(TimeoutSetting::Seconds(secs)) if *secs < 0 => {
                    return Err(Error::config_invalid(
                        field("timeout"),
                        format!("test timeout must be positive for test '{}'", test.name),
                    ));
                },
                Some(TimeoutSetting::Fractional(secs))
                    if !secs.is_finite() || *secs < 0.0 || Duration::try_from_secs_f64(*secs).is_err() =>
                {
                    return Err(Error::config_invalid(
                        field("timeout"),
                        format!("test timeout must be positive for test '{}'", test.name),
                    ));
                },
                Some(TimeoutSetting::Human(text)) if humantime::parse_duration(text).is_err() => {
                    return Err(Error::config_invalid(
                        field("timeout"),
                        format!("Invalid duration: {text}"),
                    ));
                },
                _ => {},
            }
        }

        Ok(())
    }

    /// Generates a starter configuration as YAML.
    #[must_use]
    pub fn default_yaml() -> String {
        let config = Self {
            tests: vec![
                TestSpec::new("unit", "go test ./...", true),
                TestSpec::new("race", "go test -race ./...", false).with_timeout_secs(600),
            ],
        };
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

/// Returns true if the path should be parsed as TOML.
fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
