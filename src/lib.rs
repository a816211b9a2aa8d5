//! # git-guardian
//!
//! Pre-push validation for editors and AI coding agents.
//!
//! Before a push, `git-guardian` lists the commits that are not on the
//! remote yet, runs static analysis over the files they touch, runs the
//! test suite configured in `.mcp.yml`, and reports a single verdict. The
//! same operations are served as tools over line-delimited JSON-RPC on
//! stdin/stdout so an agent can gate its own pushes.
//!
//! ## Features
//!
//! - **Commit analysis**: Unpushed commits with authors, messages, changed files and diffs
//! - **Static checks**: gofmt, go vet, golangci-lint, rustfmt, dart, shellcheck, eslint
//!   and ruff, each run only when installed and only on matching files
//! - **Configured tests**: Per-test timeouts, environment and blocking/non-blocking status
//! - **Failure explanations**: Remediation hints for every check and for test failures
//!
//! ## Example
//!
//! ```rust,no_run
//! use git_guardian::{GitRepo, Validator};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> git_guardian::Result<()> {
//!     let repo = GitRepo::discover()?;
//!     let verdict = Validator::new(&repo)
//!         .validate("origin", None, Path::new(".mcp.yml"))
//!         .await?;
//!
//!     if !verdict.success {
//!         std::process::exit(1);
//!     }
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/git-guardian/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod checks;
pub mod cli;
pub mod config;
pub mod core;
pub mod mcp;

/// Crate version, reported by `initialize` and `git-guardian version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types for convenience
pub use checks::{CheckResult, CheckRunner};
pub use config::{Config, TestSpec};
pub use core::error::{Error, Result};
pub use core::git::{Commit, CommitLister, GitRepo};
pub use core::runner::{TestResult, TestRunner};
pub use core::validate::{ValidationVerdict, Validator};
pub use mcp::registry::ToolRegistry;
