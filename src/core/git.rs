//! Git repository inspection.
//!
//! This module lists the commits that would be sent by a push and the files
//! they touch. Everything goes through the `git` CLI; the rest of the crate
//! sees it through the [`CommitLister`] trait.

use crate::core::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Separator used in `git log --format` output.
const FIELD_SEPARATOR: &str = "|||";

/// Log format producing `hash|||author|||date|||subject` lines.
const LOG_FORMAT: &str = "--format=%H|||%an|||%ai|||%s";

/// A commit that has not been pushed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Full commit hash.
    pub hash: String,
    /// Author name.
    pub author: String,
    /// Author date in ISO-like format.
    pub date: String,
    /// Subject line.
    pub message: String,
    /// Paths touched by the commit, relative to the repository root.
    pub files: Vec<String>,
    /// Patch text, present for commits found against a remote branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// Source of unpushed commits.
pub trait CommitLister {
    /// Root directory that commit paths are relative to.
    fn root(&self) -> &Path;

    /// Name of the checked-out branch.
    fn current_branch(&self) -> Result<String>;

    /// Commits on HEAD that are not on `remote/branch`.
    ///
    /// When `remote/branch` does not resolve, every commit reachable from
    /// HEAD is returned instead.
    fn unpushed_commits(&self, remote: &str, branch: &str) -> Result<Vec<Commit>>;

    /// Union of the files touched by `commits`, sorted and joined to the root.
    fn changed_files(&self, commits: &[Commit]) -> Vec<PathBuf> {
        let unique: BTreeSet<&str> = commits
            .iter()
            .flat_map(|c| c.files.iter().map(String::as_str))
            .collect();
        unique.into_iter().map(|f| self.root().join(f)).collect()
    }
}

/// Represents a Git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    /// Root directory of the repository (the work tree top level).
    root: PathBuf,
}

impl GitRepo {
    /// Discovers the Git repository from the current directory.
    pub fn discover() -> Result<Self> {
        Self::discover_from(&std::env::current_dir().map_err(|e| Error::io("get current dir", e))?)
    }

    /// Discovers the Git repository containing `path`.
    pub fn discover_from(path: &Path) -> Result<Self> {
        let not_repo = || Error::NotGitRepo {
            path: path.to_path_buf(),
        };

        if !path.is_dir() {
            return Err(not_repo());
        }

        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()
            .map_err(|e| Error::io("run git rev-parse", e))?;

        if !output.status.success() {
            return Err(not_repo());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let root = stdout
            .lines()
            .next()
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(not_repo)?;

        Ok(Self { root })
    }

    /// Runs git in the repository root and returns stdout.
    fn git<I, S>(&self, operation: &str, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::io(format!("run git {operation}"), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::git(operation, stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Returns true if `reference` names an existing revision.
    fn ref_exists(&self, reference: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", reference])
            .current_dir(&self.root)
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Parses `git log` output, optionally attaching each commit's diff.
    fn collect_commits(&self, log: &str, with_diff: bool) -> Vec<Commit> {
        log.lines()
            .filter_map(parse_log_line)
            .map(|mut commit| {
                match self.commit_files(&commit.hash) {
                    Ok(files) => commit.files = files,
                    Err(e) => tracing::debug!(hash = %commit.hash, error = %e, "Failed to list commit files"),
                }
                if with_diff {
                    match self.commit_diff(&commit.hash) {
                        Ok(diff) => commit.diff = Some(diff),
                        Err(e) => tracing::debug!(hash = %commit.hash, error = %e, "Failed to read commit diff"),
                    }
                }
                commit
            })
            .collect()
    }

    /// Returns the files changed in a single commit.
    pub fn commit_files(&self, hash: &str) -> Result<Vec<String>> {
        let stdout = self.git(
            "diff-tree",
            ["diff-tree", "--no-commit-id", "--name-only", "-r", "--root", hash],
        )?;
        Ok(stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Returns the patch introduced by a single commit.
    pub fn commit_diff(&self, hash: &str) -> Result<String> {
        self.git("show", ["show", hash, "--format=", "--no-color"])
    }
}

impl CommitLister for GitRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> Result<String> {
        let branch = self.git("branch --show-current", ["branch", "--show-current"])?;
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(Error::git("branch --show-current", "HEAD is detached"));
        }
        Ok(branch.to_string())
    }

    fn unpushed_commits(&self, remote: &str, branch: &str) -> Result<Vec<Commit>> {
        let remote_branch = format!("{remote}/{branch}");

        if !self.ref_exists(&remote_branch) {
            tracing::debug!(reference = %remote_branch, "Remote branch not found, listing all commits");
            let log = self.git("log", ["log", LOG_FORMAT])?;
            return Ok(self.collect_commits(&log, false));
        }

        let range = format!("{remote_branch}..HEAD");
        let log = self.git("log", ["log", range.as_str(), LOG_FORMAT])?;
        Ok(self.collect_commits(&log, true))
    }
}

/// Parses one `hash|||author|||date|||subject` line.
fn parse_log_line(line: &str) -> Option<Commit> {
    let mut parts = line.splitn(4, FIELD_SEPARATOR);
    let hash = parts.next()?.trim();
    let author = parts.next()?;
    let date = parts.next()?;
    let message = parts.next()?;

    if hash.is_empty() {
        return None;
    }

    Some(Commit {
        hash: hash.to_string(),
        author: author.to_string(),
        date: date.to_string(),
        message: message.to_string(),
        files: Vec::new(),
        diff: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn git(path: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .expect("run git");
        assert!(status.status.success(), "git {args:?} failed");
    }

    fn create_test_repo() -> (TempDir, GitRepo) {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path();

        git(path, &["init", "--initial-branch=main"]);
        git(path, &["config", "user.email", "test@test.com"]);
        git(path, &["config", "user.name", "Test"]);
        git(path, &["config", "commit.gpgsign", "false"]);

        let repo = GitRepo::discover_from(path).expect("discover repo");
        (temp, repo)
    }

    fn commit_file(path: &Path, name: &str, content: &str, message: &str) {
        if let Some(parent) = Path::new(name).parent() {
            std::fs::create_dir_all(path.join(parent)).expect("create dirs");
        }
        std::fs::write(path.join(name), content).expect("write file");
        git(path, &["add", name]);
        git(path, &["commit", "-m", message]);
    }

    // =========================================================================
    // Discovery tests
    // =========================================================================

    #[test]
    fn test_discover_from_subdirectory() {
        let (temp, _) = create_test_repo();

        let subdir = temp.path().join("src/lib");
        std::fs::create_dir_all(&subdir).expect("create subdir");

        let repo = GitRepo::discover_from(&subdir).expect("discover from subdir");
        // Canonicalize both paths to handle macOS /var -> /private/var symlinks
        let expected = temp.path().canonicalize().expect("canonicalize temp");
        let actual = repo.root().canonicalize().expect("canonicalize root");
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_not_git_repo() {
        let temp = TempDir::new().expect("create temp dir");
        let result = GitRepo::discover_from(temp.path());
        assert!(matches!(result, Err(Error::NotGitRepo { .. })));
    }

    #[test]
    fn test_missing_directory_is_not_git_repo() {
        let result = GitRepo::discover_from(Path::new("/definitely/not/a/real/dir"));
        assert!(matches!(result, Err(Error::NotGitRepo { .. })));
    }

    // =========================================================================
    // Branch tests
    // =========================================================================

    #[test]
    fn test_current_branch() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "initial.txt", "initial", "initial");

        assert_eq!(repo.current_branch().expect("current branch"), "main");
    }

    // =========================================================================
    // Commit listing tests
    // =========================================================================

    #[test]
    fn test_unpushed_falls_back_to_all_commits_without_remote() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "a.go", "package a", "first");
        commit_file(temp.path(), "b.sh", "echo hi", "second");

        let commits = repo
            .unpushed_commits("origin", "main")
            .expect("list commits");

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "second");
        assert_eq!(commits[0].files, vec!["b.sh".to_string()]);
        assert_eq!(commits[1].files, vec!["a.go".to_string()]);
        assert_eq!(commits[0].author, "Test");
        assert!(commits.iter().all(|c| c.diff.is_none()));
    }

    #[test]
    fn test_unpushed_against_remote_branch_includes_diff() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "a.go", "package a", "pushed");
        git(temp.path(), &["update-ref", "refs/remotes/origin/main", "HEAD"]);
        commit_file(temp.path(), "b.go", "package b", "local only");

        let commits = repo
            .unpushed_commits("origin", "main")
            .expect("list commits");

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "local only");
        let diff = commits[0].diff.as_deref().expect("diff present");
        assert!(diff.contains("package b"));
    }

    #[test]
    fn test_up_to_date_branch_has_no_unpushed_commits() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "a.go", "package a", "pushed");
        git(temp.path(), &["update-ref", "refs/remotes/origin/main", "HEAD"]);

        let commits = repo
            .unpushed_commits("origin", "main")
            .expect("list commits");
        assert!(commits.is_empty());
    }

    #[test]
    fn test_changed_files_are_unique_sorted_and_absolute() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "z.go", "package z", "one");
        commit_file(temp.path(), "a/b.go", "package b", "two");
        commit_file(temp.path(), "z.go", "package z // edit", "three");

        let commits = repo
            .unpushed_commits("origin", "main")
            .expect("list commits");
        let files = repo.changed_files(&commits);

        assert_eq!(files, vec![repo.root().join("a/b.go"), repo.root().join("z.go")]);
    }

    // =========================================================================
    // Parsing tests
    // =========================================================================

    #[test]
    fn test_parse_log_line_keeps_separator_in_subject() {
        let commit = parse_log_line("abc|||Ann|||2024-01-01 10:00:00 +0000|||fix a|||b")
            .expect("parse line");
        assert_eq!(commit.hash, "abc");
        assert_eq!(commit.message, "fix a|||b");
    }

    #[test]
    fn test_parse_log_line_rejects_short_lines() {
        assert!(parse_log_line("abc|||Ann").is_none());
        assert!(parse_log_line("").is_none());
    }

    #[test]
    fn test_commit_serialization_omits_missing_diff() {
        let commit = Commit {
            hash: "abc".into(),
            files: vec!["main.go".into()],
            ..Commit::default()
        };
        let json = serde_json::to_value(&commit).expect("serialize");
        assert!(json.get("diff").is_none());
        assert_eq!(json["files"][0], "main.go");
    }
}
