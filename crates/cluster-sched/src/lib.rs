//! Uniform Job Submission for Local Pools, SLURM and Torque
//!
//! This crate lets a caller run a shell command or a registered Rust function
//! as a *job* without caring where it runs. The same [`Job`] API drives a
//! local worker pool or an HPC batch scheduler.
//!
//! # Overview
//!
//! A job moves through a fixed lifecycle:
//! 1. **Construction**: Render backend-specific scripts in memory
//! 2. **Write**: Persist scripts (and function payloads) to disk
//! 3. **Submit**: Queue on the local pool, or call `sbatch` / `qsub` with retry
//! 4. **Wait**: Await the pool result or poll the batch queue
//! 5. **Get / Clean**: Collect output, then remove every generated file
//!
//! # Supported Backends
//!
//! | Backend | Submit | Tracking | Files |
//! |---------|--------|----------|-------|
//! | Local | worker pool | pool result | `<name>.<suffix>` |
//! | SLURM | sbatch | squeue, sacct | `.sbatch` + `.script` |
//! | Torque | qsub | qstat | `.qsub` |
//!
//! # Example: Command Job
//!
//! ```ignore
//! use cluster_sched::{ClusterConfig, Job, JobOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = ClusterConfig::from_file("cluster.yaml")?.build_backend();
//!
//!     let mut index = Job::builder("bwa index ref.fa")
//!         .options(JobOptions::new().with_cores(4).with_mem(8000))
//!         .build(backend.clone())?;
//!     index.submit(None).await?;
//!
//!     let mut align = Job::builder("bwa mem ref.fa reads.fq")
//!         .name("align")
//!         .options(JobOptions::new().depends_on(&index))
//!         .build(backend)?;
//!     align.submit(None).await?;
//!
//!     let output = align.get().await?;
//!     println!("exit code: {:?}", output.exit_code);
//!     align.clean().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Example: Function Job
//!
//! Functions run in a separate process, so the binary that submits them must
//! also be able to run them:
//!
//! ```ignore
//! use cluster_sched::{FunctionArgs, FunctionCall, FunctionRegistry, Job, SchedResult};
//! use serde_json::{Value, json};
//!
//! fn count_reads(args: FunctionArgs) -> SchedResult<Value> {
//!     Ok(json!(args.positional.len()))
//! }
//!
//! let mut registry = FunctionRegistry::new();
//! registry.register(count_reads)?;
//! if let Some(result) = registry.dispatch_from_args(std::env::args()) {
//!     return result;
//! }
//!
//! let call = FunctionCall::new(count_reads, FunctionArgs::new().with_arg("reads.fq"))?;
//! let mut job = Job::builder(call).build(backend)?;
//! job.submit(None).await?;
//! let value = job.function_result().await?;
//! ```

pub mod artifact;
pub mod backend;
pub mod config;
pub mod dependency;
pub mod dispatch;
pub mod error;
pub mod function;
pub mod job;
pub mod local;
pub mod options;
pub mod queue;
pub mod runner;
pub mod script;
pub mod slurm;
pub mod torque;

// Re-exports
pub use artifact::Artifact;
pub use backend::{Backend, BackendKind, Outcome, RetryPolicy, Submission, SubmitRequest};
pub use config::ClusterConfig;
pub use dependency::{Dependency, JobRef};
pub use dispatch::{clean, clean_dir, make_job, make_job_file, submit, submit_file};
pub use error::{SchedError, SchedResult};
pub use function::{
    FunctionArgs, FunctionArtifact, FunctionCall, FunctionRegistry, Imports,
    RUN_FUNCTION_COMMAND,
};
pub use job::{Job, JobBuilder, JobCommand, JobOutput, JobState};
pub use local::{LocalBackend, PendingResult, WorkerPool};
pub use options::{JobOptions, OPTION_NAMES};
pub use queue::{QueueMonitor, QueueRecord, QueueState};
pub use runner::{CommandOutput, CommandRunner, ShellRunner};
pub use script::{DEFAULT_SUFFIX, Resources};
pub use slurm::{SlurmBackend, SlurmQueue};
pub use torque::{TorqueBackend, TorqueQueue};
