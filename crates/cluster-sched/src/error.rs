//! Error handling for cluster job submission.

use thiserror::Error;

/// Result type for cluster operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur while building, submitting or tracking jobs.
#[derive(Error, Debug)]
pub enum SchedError {
    /// An option name outside the accepted set was passed to a job.
    #[error("Unrecognized argument: {0}")]
    UnrecognizedOption(String),

    /// An accepted option carried a value that could not be used.
    #[error("Invalid value for option {option}: {value}")]
    InvalidOption { option: String, value: String },

    /// A dependency was neither a job nor a numeric batch id.
    #[error("Dependencies must be a job or a numeric job id, got: {0}")]
    InvalidDependency(String),

    /// A raw batch id was used as a dependency of a local job.
    #[error("In local mode, dependency tracking only works with Job objects, got id: {0}")]
    LocalDependency(String),

    /// A job dependency was used before that job was submitted.
    #[error("Dependency {0} has not been submitted")]
    DependencyNotSubmitted(String),

    /// The function handle does not resolve to a named module path.
    #[error("Cannot determine the defining module of function: {0}")]
    FunctionNotIntrospectable(String),

    /// The runner does not know the requested function.
    #[error("Function not registered with this runner: {0}")]
    UnknownFunction(String),

    /// A packaged function ran but returned an error.
    #[error("Function {function} failed: {message}")]
    FunctionFailed { function: String, message: String },

    /// Submission kept failing after every retry.
    #[error("Submission failed after {attempts} attempts: {command} - {message}")]
    SubmitFailed {
        command: String,
        attempts: u32,
        message: String,
    },

    /// An external command could not be executed.
    #[error("Command failed: {command} - {message}")]
    CommandError { command: String, message: String },

    /// An external command produced output we could not parse.
    #[error("Unexpected output from {command}: {output}")]
    UnexpectedOutput { command: String, output: String },

    /// The queue lookup service failed.
    #[error("Queue lookup failed for job {job_id}: {message}")]
    QueueError { job_id: String, message: String },

    /// The local worker pool has been shut down.
    #[error("Worker pool is closed")]
    PoolClosed,

    /// A local pool task ended abnormally.
    #[error("Worker pool task failed: {0}")]
    PoolTask(String),

    /// An operation requires a submitted job.
    #[error("Job not submitted: {0}")]
    NotSubmitted(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML configuration error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),
}

impl SchedError {
    /// Whether retrying the same external invocation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SchedError::CommandError { .. } | SchedError::IoError(_)
        )
    }
}
