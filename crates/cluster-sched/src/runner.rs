//! Running external commands.
//!
//! Two kinds of invocation go through [`CommandRunner`]: direct program calls
//! (`sbatch`, `qsub`, `squeue`, ...) whose stdout is parsed, and shell
//! commands executed by the local worker pool, whose output is also copied
//! to the job's `.out`/`.err` files.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;

use crate::error::{SchedError, SchedResult};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn from_output(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Executes external programs on behalf of the backends.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit status is not an error at this level; callers decide.
    async fn output(&self, program: &str, args: &[String]) -> SchedResult<CommandOutput>;

    /// Run a shell command line, optionally copying stdout/stderr to files.
    async fn run(
        &self,
        command: &str,
        stdout: Option<&Path>,
        stderr: Option<&Path>,
    ) -> SchedResult<CommandOutput>;
}

/// Runs commands through `tokio::process`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Create a runner that executes shell commands with `bash -c`.
    pub fn new() -> Self {
        Self {
            shell: "bash".to_string(),
        }
    }

    /// Use a different shell for [`CommandRunner::run`].
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn output(&self, program: &str, args: &[String]) -> SchedResult<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SchedError::CommandError {
                command: program.to_string(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput::from_output(output))
    }

    async fn run(
        &self,
        command: &str,
        stdout: Option<&Path>,
        stderr: Option<&Path>,
    ) -> SchedResult<CommandOutput> {
        tracing::debug!(command, "Running shell command");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SchedError::CommandError {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let output = CommandOutput::from_output(output);

        if let Some(path) = stdout {
            fs::write(path, &output.stdout).await?;
        }
        if let Some(path) = stderr {
            fs::write(path, &output.stderr).await?;
        }

        Ok(output)
    }
}

/// Render a program invocation for logs and error messages.
pub(crate) fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_runner_captures_output() {
        let runner = ShellRunner::new();
        let output = runner
            .run("echo hello; echo oops >&2; exit 3", None, None)
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_shell_runner_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("job.cluster.out");
        let err = dir.path().join("job.cluster.err");

        let runner = ShellRunner::new();
        let output = runner
            .run("echo done", Some(&out), Some(&err))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "done\n");
        assert_eq!(std::fs::read_to_string(&err).unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_program_is_command_error() {
        let runner = ShellRunner::new();
        let err = runner
            .output("definitely-not-a-real-binary-xyz", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SchedError::CommandError { .. }));
    }

    #[test]
    fn test_display_command() {
        let args = vec!["--dependency=afterok:1".to_string(), "a.sbatch".to_string()];
        assert_eq!(
            display_command("sbatch", &args),
            "sbatch --dependency=afterok:1 a.sbatch"
        );
    }
}
