//! Core functionality for git-guardian.
//!
//! This module contains the main components:
//! - [`executor`]: Shell command execution with timeouts
//! - [`git`]: Unpushed-commit inspection
//! - [`runner`]: Configured test execution
//! - [`validate`]: Pre-push validation combining checks and tests
//! - [`error`]: Error types and result handling

pub mod error;
pub mod executor;
pub mod git;
pub mod runner;
pub mod validate;
