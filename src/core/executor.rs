//! Command execution for checks and configured tests.
//!
//! This module runs external commands with a working directory and an
//! optional deadline, capturing stdout and stderr. A command that outlives
//! its deadline is killed, along with anything it started in the background,
//! and reported as timed out, which is distinct from
//! a command that exits with a non-zero status.

use crate::core::error::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// Exit code reported for commands killed at their deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command. `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Whether the command was killed due to timeout.
    pub timed_out: bool,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0)) && !self.timed_out
    }

    /// Returns stdout followed by stderr, separated by a newline and trimmed.
    #[must_use]
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            stdout.to_string()
        } else if stdout.is_empty() {
            stderr.to_string()
        } else {
            format!("{stdout}\n{stderr}")
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Deadline for the command. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Environment variables to set.
    pub env: Vec<(String, String)>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout: Some(Duration::from_secs(300)),
            env: Vec::new(),
        }
    }
}

impl ExecuteOptions {
    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Executor for running external commands.
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes a command line through the platform shell.
    ///
    /// An empty command is rejected with [`Error::EmptyCommand`] before
    /// anything is spawned.
    pub async fn execute(&self, command: &str, options: ExecuteOptions) -> Result<CommandOutput> {
        if command.trim().is_empty() {
            return Err(Error::EmptyCommand);
        }

        let (shell, shell_arg) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };

        let mut cmd = StdCommand::new(shell);
        cmd.arg(shell_arg).arg(command);

        self.run(cmd, command, &options).await
    }

    /// Executes a program directly with an argument vector, bypassing the shell.
    pub async fn execute_program<I, S>(
        &self,
        program: &str,
        args: I,
        options: ExecuteOptions,
    ) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if program.trim().is_empty() {
            return Err(Error::EmptyCommand);
        }

        let mut cmd = StdCommand::new(program);
        cmd.args(args);

        self.run(cmd, program, &options).await
    }

    /// Spawns a prepared command and waits for it, honoring the deadline.
    async fn run(
        &self,
        mut cmd: StdCommand,
        label: &str,
        options: &ExecuteOptions,
    ) -> Result<CommandOutput> {
        let start = Instant::now();

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // A fresh process group lets a timeout reach background grandchildren.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = Command::from(cmd)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::io(format!("spawn '{label}'"), e))?;
        let pid = child.id();

        // The deadline covers draining the pipes as well as the exit, since a
        // background process can hold them open after the shell is gone.
        let finished = match options.timeout {
            Some(deadline) => timeout(deadline, collect(&mut child)).await.ok(),
            None => Some(collect(&mut child).await),
        };

        let Some((waited, stdout, stderr)) = finished else {
            let deadline = options.timeout.unwrap_or_default();
            tracing::warn!(command = %label, timeout = ?deadline, "Command timed out, killing");
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            // Kill errors are irrelevant once the deadline has passed.
            drop(child.kill().await);
            return Ok(CommandOutput {
                exit_code: Some(TIMEOUT_EXIT_CODE),
                stdout: String::new(),
                stderr: format!(
                    "Command timed out after {}",
                    humantime::format_duration(deadline)
                ),
                timed_out: true,
                duration: start.elapsed(),
            });
        };
        let status = waited.map_err(|e| Error::io(format!("wait for '{label}'"), e))?;

        Ok(CommandOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            timed_out: false,
            duration: start.elapsed(),
        })
    }

    /// Checks if a command exists in PATH.
    #[must_use]
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }
}

/// Waits for the child to exit and for both of its pipes to close.
async fn collect(child: &mut Child) -> (std::io::Result<ExitStatus>, String, String) {
    let stdout = read_stream(child.stdout.take());
    let stderr = read_stream(child.stderr.take());
    tokio::join!(child.wait(), stdout, stderr)
}

/// Sends SIGKILL to the process group led by `pid`.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers and touches no memory owned by
    // this process. A negative pid addresses the whole group.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        tracing::debug!(pgid, "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Drains a child pipe into a string, replacing invalid UTF-8.
async fn read_stream<R>(stream: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "Failed to read child output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_execute_simple_command() {
        let executor = Executor::new();
        let output = executor
            .execute("echo hello", ExecuteOptions::default())
            .await
            .expect("should succeed");

        assert!(output.success());
        assert!(output.stdout.contains("hello"));
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let executor = Executor::new();
        let output = executor
            .execute("exit 3", ExecuteOptions::default())
            .await
            .expect("should complete");

        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn test_execute_empty_command_does_not_spawn() {
        let executor = Executor::new();
        let result = executor.execute("   ", ExecuteOptions::default()).await;
        assert!(matches!(result, Err(Error::EmptyCommand)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_timeout() {
        let executor = Executor::new();
        let output = executor
            .execute(
                "sleep 10",
                ExecuteOptions::default().timeout(Duration::from_millis(200)),
            )
            .await
            .expect("should complete");

        assert!(output.timed_out);
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(TIMEOUT_EXIT_CODE));
        assert!(output.duration < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_covers_pipes_held_by_background_process() {
        let output = Executor::new()
            .execute(
                "sleep 10 & echo started",
                ExecuteOptions::default().timeout(Duration::from_millis(500)),
            )
            .await
            .expect("should complete");

        assert!(output.timed_out);
        assert!(output.duration < Duration::from_secs(3), "took {:?}", output.duration);
    }

    /// True while `pid` exists and is not a zombie awaiting its reaper.
    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
            stat.rsplit_once(") ")
                .is_some_and(|(_, rest)| !rest.starts_with('Z'))
        })
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_background_grandchildren() {
        let temp = TempDir::new().expect("create temp dir");

        let output = Executor::new()
            .execute(
                "sleep 30 & echo $! > sleeper.pid; wait",
                ExecuteOptions::default()
                    .cwd(temp.path())
                    .timeout(Duration::from_millis(500)),
            )
            .await
            .expect("should complete");
        assert!(output.timed_out);

        let pid = std::fs::read_to_string(temp.path().join("sleeper.pid")).expect("read pid");
        let pid = pid.trim();
        let mut alive = is_running(pid);
        for _ in 0..40 {
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            alive = is_running(pid);
        }
        assert!(!alive, "background sleep {pid} survived the timeout");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_combined_output_appends_stderr() {
        let executor = Executor::new();
        let output = executor
            .execute("echo out; echo err 1>&2", ExecuteOptions::default())
            .await
            .expect("should complete");

        assert_eq!(output.combined_output(), "out\nerr");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_in_working_directory() {
        let temp = TempDir::new().expect("create temp dir");
        std::fs::write(temp.path().join("marker.txt"), "x").expect("write marker");

        let output = Executor::new()
            .execute("ls", ExecuteOptions::default().cwd(temp.path()))
            .await
            .expect("should complete");

        assert!(output.stdout.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_with_env() {
        let output = Executor::new()
            .execute(
                "printf %s \"$GUARDIAN_TEST_VALUE\"",
                ExecuteOptions::default().env("GUARDIAN_TEST_VALUE", "42"),
            )
            .await
            .expect("should complete");

        assert_eq!(output.stdout, "42");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_program_passes_arguments_verbatim() {
        let output = Executor::new()
            .execute_program("echo", ["a b", "c"], ExecuteOptions::default())
            .await
            .expect("should complete");

        assert_eq!(output.stdout.trim(), "a b c");
    }

    #[tokio::test]
    async fn test_execute_program_missing_binary_is_launch_error() {
        let result = Executor::new()
            .execute_program(
                "definitely_not_a_real_command_12345",
                Vec::<String>::new(),
                ExecuteOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_launch_error() {
        let result = Executor::new()
            .execute(
                "echo hi",
                ExecuteOptions::default().cwd("/definitely/not/a/real/dir"),
            )
            .await;

        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_combined_output_variants() {
        let mut output = CommandOutput {
            exit_code: Some(0),
            stdout: "only out\n".to_string(),
            stderr: String::new(),
            timed_out: false,
            duration: Duration::ZERO,
        };
        assert_eq!(output.combined_output(), "only out");

        output.stdout.clear();
        output.stderr = "only err\n".to_string();
        assert_eq!(output.combined_output(), "only err");
    }

    #[test]
    fn test_signal_exit_is_not_success() {
        let output = CommandOutput {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            duration: Duration::ZERO,
        };
        assert!(!output.success());
    }

    #[test]
    fn test_command_exists() {
        if cfg!(unix) {
            assert!(Executor::command_exists("sh"));
        } else {
            assert!(Executor::command_exists("cmd"));
        }

        assert!(!Executor::command_exists("definitely_not_a_real_command_12345"));
    }
}
