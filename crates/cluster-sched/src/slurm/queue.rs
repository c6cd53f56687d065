//! Job lookup through `squeue` and `sacct`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SchedError, SchedResult};
use crate::queue::{QueueMonitor, QueueRecord};
use crate::runner::CommandRunner;
use crate::slurm::parser;

/// Queue lookup for SLURM clusters.
pub struct SlurmQueue {
    runner: Arc<dyn CommandRunner>,
}

impl SlurmQueue {
    /// Create a lookup service running commands with `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run squeue for pending and running jobs.
    async fn run_squeue(&self, job_id: &str) -> SchedResult<Option<QueueRecord>> {
        let args: Vec<String> = ["-j", job_id, "-o", "%i|%j|%T|%r"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = self
            .runner
            .output("squeue", &args)
            .await
            .map_err(|e| queue_error(job_id, e))?;

        if !output.success() {
            // squeue rejects ids that have left the queue
            if output.stderr.contains("Invalid job id specified") {
                return Ok(None);
            }
            return Err(stderr_error(job_id, &output.stderr));
        }
        parser::parse_squeue_output(&output.stdout)
    }

    /// Run sacct for finished jobs.
    async fn run_sacct(&self, job_id: &str) -> SchedResult<Option<QueueRecord>> {
        let args: Vec<String> = ["-j", job_id, "-o", "JobID,JobName,State,ExitCode", "-P"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = self
            .runner
            .output("sacct", &args)
            .await
            .map_err(|e| queue_error(job_id, e))?;

        if !output.success() {
            let stderr = output.stderr.to_lowercase();
            if stderr.contains("accounting storage is disabled")
                || stderr.contains("invalid job id")
            {
                tracing::debug!(id = job_id, "No accounting record");
                return Ok(None);
            }
            return Err(stderr_error(job_id, &output.stderr));
        }
        parser::parse_sacct_output(&output.stdout)
    }
}

#[async_trait]
impl QueueMonitor for SlurmQueue {
    async fn lookup(&self, job_id: &str) -> SchedResult<Option<QueueRecord>> {
        if let Some(record) = self.run_squeue(job_id).await? {
            return Ok(Some(record));
        }
        self.run_sacct(job_id).await
    }
}

fn queue_error(job_id: &str, error: SchedError) -> SchedError {
    SchedError::QueueError {
        job_id: job_id.to_string(),
        message: error.to_string(),
    }
}

fn stderr_error(job_id: &str, stderr: &str) -> SchedError {
    SchedError::QueueError {
        job_id: job_id.to_string(),
        message: stderr.trim().to_string(),
    }
}
