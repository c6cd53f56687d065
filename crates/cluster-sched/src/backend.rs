//! The backend strategy interface.
//!
//! A [`Backend`] renders job scripts and knows how to submit and wait on
//! them. [`crate::Job`] holds one backend for its whole life and never looks
//! at which kind it is.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;
use crate::error::{SchedError, SchedResult};
use crate::local::PendingResult;
use crate::queue::QueueRecord;
use crate::runner::{CommandOutput, CommandRunner, display_command};
use crate::script::{ScriptSet, ScriptSpec};

/// Which execution environment a backend drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The in-process worker pool.
    #[default]
    Local,
    /// SLURM (`sbatch`).
    Slurm,
    /// Torque / PBS (`qsub`).
    Torque,
}

impl BackendKind {
    /// Whether jobs go through an external batch scheduler.
    pub fn is_batch(&self) -> bool {
        !matches!(self, BackendKind::Local)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Slurm => write!(f, "slurm"),
            BackendKind::Torque => write!(f, "torque"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "normal" => Ok(BackendKind::Local),
            "slurm" => Ok(BackendKind::Slurm),
            "torque" | "pbs" => Ok(BackendKind::Torque),
            other => Err(SchedError::ConfigError(format!("Unknown backend: {other}"))),
        }
    }
}

/// Handle returned by a successful submission.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Accepted by a batch scheduler under this id.
    Batch { id: String },
    /// Queued on the local worker pool.
    Local(PendingResult),
}

impl Submission {
    /// The scheduler-assigned id, for batch submissions.
    pub fn batch_id(&self) -> Option<&str> {
        match self {
            Submission::Batch { id } => Some(id),
            Submission::Local(_) => None,
        }
    }
}

/// How a waited-on job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Output captured by the local worker pool.
    Local(CommandOutput),
    /// Last queue snapshot of a batch job.
    Batch(QueueRecord),
}

impl Outcome {
    /// Exit code, when known.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Outcome::Local(output) => output.exit_code,
            Outcome::Batch(record) => record.exit_code,
        }
    }
}

/// A script submission.
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    /// The script to submit.
    pub script: &'a Path,
    /// Job name.
    pub name: &'a str,
    /// Where standard output is captured (local pool only).
    pub outfile: &'a Path,
    /// Where standard error is captured (local pool only).
    pub errfile: &'a Path,
    /// Jobs that must finish first.
    pub dependencies: &'a [Dependency],
    /// Worker pool size, used when the pool has to be created.
    pub threads: Option<usize>,
}

/// One execution environment.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Which kind of backend this is.
    fn kind(&self) -> BackendKind;

    /// Render the submission (and optional execution) script for a job.
    fn build_scripts(&self, spec: &ScriptSpec<'_>) -> ScriptSet;

    /// Extensions of every file this backend generates, for `clean_dir`.
    fn generated_extensions(&self, suffix: &str) -> Vec<String> {
        vec![format!(".{suffix}.err"), format!(".{suffix}.out")]
    }

    /// Submit a script, honouring its dependencies.
    async fn submit(&self, request: SubmitRequest<'_>) -> SchedResult<Submission>;

    /// Block until a submission has finished.
    async fn wait(&self, submission: &Submission) -> SchedResult<Outcome>;
}

/// Retry policy for external submit commands.
///
/// The first attempt is followed by up to `retries` more, with a fixed
/// delay in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub retries: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy.
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }
}

/// Invoke a submit command, retrying failed invocations.
///
/// Spawn failures and non-zero exit codes are retried; the stdout of the
/// first successful invocation is returned.
pub(crate) async fn invoke_with_retry(
    runner: &dyn CommandRunner,
    policy: RetryPolicy,
    program: &str,
    args: &[String],
) -> SchedResult<String> {
    let command = display_command(program, args);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let error = match runner.output(program, args).await {
            Ok(output) if output.success() => return Ok(output.stdout),
            Ok(output) => SchedError::CommandError {
                command: command.clone(),
                message: format!(
                    "exit code {:?}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            },
            Err(e) => e,
        };

        if !error.is_transient() {
            return Err(error);
        }
        if attempt > policy.retries {
            return Err(SchedError::SubmitFailed {
                command,
                attempts: attempt,
                message: error.to_string(),
            });
        }

        tracing::warn!(
            command = %command,
            attempt,
            error = %error,
            "Submission failed, retrying in {:?}",
            policy.delay
        );
        tokio::time::sleep(policy.delay).await;
    }
}

/// Batch ids for a dependency list.
///
/// Jobs contribute their assigned id; raw ids pass through.
pub(crate) fn batch_dependency_ids(dependencies: &[Dependency]) -> SchedResult<Vec<String>> {
    dependencies
        .iter()
        .map(|dependency| match dependency {
            Dependency::Id(id) => Ok(id.clone()),
            Dependency::Job(job) => job
                .id()
                .map(str::to_string)
                .ok_or_else(|| SchedError::DependencyNotSubmitted(job.name().to_string())),
        })
        .collect()
}
