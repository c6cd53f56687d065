//! The job: one command or function call, its scripts and its lifecycle.
//!
//! A [`Job`] renders every script at construction without touching the
//! disk, then moves through `Constructed → Written → Submitted → Done`.
//! [`Job::clean`] removes the generated files in any state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::fs;

use crate::artifact::Artifact;
use crate::backend::{Backend, BackendKind, Outcome, SubmitRequest};
use crate::dependency::{Dependency, JobRef, Tracker};
use crate::error::{SchedError, SchedResult};
use crate::function::{FunctionArtifact, FunctionCall, Imports};
use crate::options::JobOptions;
use crate::queue::QueueRecord;
use crate::script::{Resources, ScriptSpec};

/// What a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum JobCommand {
    /// A shell command line.
    Shell(String),
    /// A registered function, run through a driver script.
    Function(FunctionCall),
}

impl From<&str> for JobCommand {
    fn from(command: &str) -> Self {
        JobCommand::Shell(command.to_string())
    }
}

impl From<String> for JobCommand {
    fn from(command: String) -> Self {
        JobCommand::Shell(command)
    }
}

impl From<FunctionCall> for JobCommand {
    fn from(call: FunctionCall) -> Self {
        JobCommand::Function(call)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Scripts rendered in memory only.
    Constructed,
    /// Scripts on disk.
    Written,
    /// Handed to the backend.
    Submitted,
    /// Finished.
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Constructed => write!(f, "constructed"),
            JobState::Written => write!(f, "written"),
            JobState::Submitted => write!(f, "submitted"),
            JobState::Done => write!(f, "done"),
        }
    }
}

/// Exit code and captured output of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    /// Exit code, when known.
    pub exit_code: Option<i32>,
    /// Standard output, `None` when the output file does not exist.
    pub stdout: Option<String>,
    /// Standard error, `None` when the error file does not exist.
    pub stderr: Option<String>,
}

/// Builder for [`Job`].
#[derive(Debug, Clone)]
pub struct JobBuilder {
    command: JobCommand,
    args: Vec<String>,
    name: Option<String>,
    path: Option<PathBuf>,
    options: JobOptions,
    function_runner: Option<PathBuf>,
}

impl JobBuilder {
    fn new(command: JobCommand) -> Self {
        Self {
            command,
            args: Vec::new(),
            name: None,
            path: None,
            options: JobOptions::default(),
            function_runner: None,
        }
    }

    /// Append an argument.
    ///
    /// Shell commands get it appended to the command line, functions as a
    /// positional string argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Job name. Derived from the command when not set.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Directory for scripts and output. The current directory by default.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Job options.
    pub fn options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// Executable that runs packaged functions, the current one by default.
    pub fn function_runner(mut self, runner: impl Into<PathBuf>) -> Self {
        self.function_runner = Some(runner.into());
        self
    }

    /// Build the job for `backend`. Nothing is written to disk.
    pub fn build(self, backend: Arc<dyn Backend>) -> SchedResult<Job> {
        self.options.validate()?;

        let name = match self.name {
            Some(name) => name,
            None => derive_name(&self.command)?,
        };
        let dir = std::path::absolute(self.path.as_deref().unwrap_or(Path::new(".")))?;
        let suffix = self.options.suffix().to_string();
        let resources = self.options.resources();

        let (command, function) = match self.command {
            JobCommand::Shell(command) => {
                let mut parts = vec![command];
                parts.extend(self.args);
                (parts.join(" "), None)
            }
            JobCommand::Function(mut call) => {
                call.args_mut()
                    .positional
                    .extend(self.args.into_iter().map(Value::String));
                let imports: Imports = self.options.imports.iter().cloned().collect();
                let function = FunctionArtifact::new(
                    dir.join(format!("{name}_func.sh")),
                    &call,
                    &imports,
                    self.function_runner.as_deref(),
                )?;
                let command = format!("bash {}", function.driver().path().display());
                (command, Some(function))
            }
        };

        let spec = ScriptSpec {
            name: &name,
            command: &command,
            dir: &dir,
            suffix: &suffix,
            resources: &resources,
        };
        let scripts = backend.build_scripts(&spec);
        let submission = Artifact::script(&scripts.submission.path, scripts.submission.text)?;
        let execution = scripts
            .execution
            .map(|script| Artifact::script(&script.path, script.text))
            .transpose()?;
        let outfile = spec.outfile();
        let errfile = spec.errfile();

        tracing::debug!(
            job = %name,
            backend = %backend.kind(),
            script = %submission.path().display(),
            "Built job"
        );

        Ok(Job {
            tracker: Arc::new(Tracker::new(name.clone())),
            name,
            command,
            dir,
            suffix,
            resources,
            threads: self.options.threads,
            dependencies: self.options.dependencies,
            backend,
            submission,
            execution,
            function,
            outfile,
            errfile,
            written: false,
            outcome: None,
        })
    }
}

/// Name from the command: basename of the first token, or the function name.
fn derive_name(command: &JobCommand) -> SchedResult<String> {
    match command {
        JobCommand::Shell(command) => command
            .split_whitespace()
            .next()
            .and_then(|program| program.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SchedError::InvalidOption {
                option: "command".to_string(),
                value: command.clone(),
            }),
        JobCommand::Function(call) => Ok(call.name().to_string()),
    }
}

/// One unit of work on a backend.
pub struct Job {
    name: String,
    command: String,
    dir: PathBuf,
    suffix: String,
    resources: Resources,
    threads: Option<usize>,
    dependencies: Vec<Dependency>,
    backend: Arc<dyn Backend>,
    submission: Artifact,
    execution: Option<Artifact>,
    function: Option<FunctionArtifact>,
    outfile: PathBuf,
    errfile: PathBuf,
    tracker: Arc<Tracker>,
    written: bool,
    outcome: Option<Outcome>,
}

impl Job {
    /// Start building a job running `command`.
    pub fn builder(command: impl Into<JobCommand>) -> JobBuilder {
        JobBuilder::new(command.into())
    }

    /// Job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Batch id, once submitted to a scheduler.
    pub fn id(&self) -> Option<&str> {
        self.tracker.id()
    }

    /// Which backend runs the job.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The command line the scripts execute.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Absolute working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Resource requests.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Cores requested.
    pub fn cores(&self) -> u32 {
        self.resources.cores
    }

    /// Dependencies, in order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Where standard output ends up.
    pub fn outfile(&self) -> &Path {
        &self.outfile
    }

    /// Where standard error ends up.
    pub fn errfile(&self) -> &Path {
        &self.errfile
    }

    /// The submission script.
    pub fn submission(&self) -> &Artifact {
        &self.submission
    }

    /// The separate execution script, for backends that use one.
    pub fn execution(&self) -> Option<&Artifact> {
        self.execution.as_ref()
    }

    /// The function driver, for function jobs.
    pub fn function(&self) -> Option<&FunctionArtifact> {
        self.function.as_ref()
    }

    /// Every file this job generates.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.submission.path().to_path_buf()];
        if let Some(ref execution) = self.execution {
            files.push(execution.path().to_path_buf());
        }
        if let Some(ref function) = self.function {
            files.push(function.driver().path().to_path_buf());
            files.push(function.payload().path().to_path_buf());
            files.push(function.output_path().to_path_buf());
        }
        files
    }

    /// A handle for using this job as a dependency.
    pub fn reference(&self) -> JobRef {
        JobRef::new(Arc::clone(&self.tracker))
    }

    /// Whether the scripts have been written.
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Whether the job has been submitted.
    pub fn is_submitted(&self) -> bool {
        self.tracker.submission().is_some()
    }

    /// Whether the job is known to have finished.
    pub fn is_done(&self) -> bool {
        self.tracker.is_done()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        if self.is_done() {
            JobState::Done
        } else if self.is_submitted() {
            JobState::Submitted
        } else if self.written {
            JobState::Written
        } else {
            JobState::Constructed
        }
    }

    /// How the job ended, once waited on.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Last queue snapshot, for batch jobs that have been waited on.
    pub fn queue_info(&self) -> Option<&QueueRecord> {
        match self.outcome {
            Some(Outcome::Batch(ref record)) => Some(record),
            _ => None,
        }
    }

    /// Write every script.
    ///
    /// With `overwrite` false, files that already exist are left alone.
    pub async fn write(&mut self, overwrite: bool) -> SchedResult<()> {
        if let Some(ref mut function) = self.function {
            function.write(overwrite).await?;
        }
        if let Some(ref mut execution) = self.execution {
            execution.write(overwrite).await?;
        }
        self.submission.write(overwrite).await?;
        self.written = true;

        tracing::debug!(job = %self.name, files = ?self.files(), "Wrote job scripts");
        Ok(())
    }

    /// Submit the job, writing its scripts first if needed.
    ///
    /// Local jobs wait here for unfinished dependencies. `max_queue_len`
    /// is recorded but not enforced.
    pub async fn submit(&mut self, max_queue_len: Option<usize>) -> SchedResult<()> {
        if self.is_submitted() {
            tracing::warn!(job = %self.name, "Job already submitted");
            return Ok(());
        }
        if !self.written {
            self.write(true).await?;
        }
        if let Some(max_queue_len) = max_queue_len {
            tracing::debug!(job = %self.name, max_queue_len, "Queue length limit not enforced");
        }

        let submission = self
            .backend
            .submit(SubmitRequest {
                script: self.submission.path(),
                name: &self.name,
                outfile: &self.outfile,
                errfile: &self.errfile,
                dependencies: &self.dependencies,
                threads: self.threads,
            })
            .await?;

        self.tracker
            .record_submission(Arc::clone(&self.backend), submission);
        tracing::info!(
            job = %self.name,
            id = self.id().unwrap_or("local"),
            backend = %self.backend.kind(),
            "Submitted job"
        );
        Ok(())
    }

    /// Block until the job has finished.
    pub async fn wait(&mut self) -> SchedResult<&Outcome> {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => {
                let (backend, submission) = self
                    .tracker
                    .submission()
                    .ok_or_else(|| SchedError::NotSubmitted(self.name.clone()))?;
                let outcome = backend.wait(&submission).await?;
                self.tracker.mark_done();
                tracing::info!(
                    job = %self.name,
                    exit_code = ?outcome.exit_code(),
                    "Job finished"
                );
                outcome
            }
        };
        Ok(&*self.outcome.insert(outcome))
    }

    /// Wait, then return the exit code and output.
    ///
    /// Local jobs return what the pool captured; batch jobs read the
    /// output files written by the scheduler.
    pub async fn get(&mut self) -> SchedResult<JobOutput> {
        let outcome = self.wait().await?.clone();
        match outcome {
            Outcome::Local(output) => Ok(JobOutput {
                exit_code: output.exit_code,
                stdout: Some(output.stdout),
                stderr: Some(output.stderr),
            }),
            Outcome::Batch(record) => Ok(JobOutput {
                exit_code: record.exit_code,
                stdout: read_optional(&self.outfile).await?,
                stderr: read_optional(&self.errfile).await?,
            }),
        }
    }

    /// Wait, then return the value returned by a function job.
    pub async fn function_result(&mut self) -> SchedResult<Value> {
        self.wait().await?;
        match self.function {
            Some(ref function) => function.read_result().await,
            None => Err(SchedError::ConfigError(format!(
                "Job {} does not run a function",
                self.name
            ))),
        }
    }

    /// Delete every generated file. Safe in any state.
    pub async fn clean(&mut self) -> SchedResult<()> {
        self.submission.clean().await?;
        if let Some(ref mut execution) = self.execution {
            execution.clean().await?;
        }
        if let Some(ref mut function) = self.function {
            function.clean().await?;
        }
        self.written = false;
        tracing::debug!(job = %self.name, "Cleaned job files");
        Ok(())
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ID: {}, state: {}",
            self.name,
            self.id().unwrap_or("None"),
            self.state()
        )
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("id", &self.id())
            .field("backend", &self.backend.kind())
            .field("state", &self.state())
            .field("command", &self.command)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// File contents, or `None` when the file does not exist.
async fn read_optional(path: &Path) -> SchedResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
