//! Job lookup through `qstat`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SchedError, SchedResult};
use crate::queue::{QueueMonitor, QueueRecord};
use crate::runner::CommandRunner;
use crate::torque::parser;

/// Queue lookup for Torque / PBS clusters.
pub struct TorqueQueue {
    runner: Arc<dyn CommandRunner>,
}

impl TorqueQueue {
    /// Create a lookup service running commands with `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run `qstat <flag> <id>`; `None` when the server no longer knows the job.
    async fn run_qstat(&self, flag: &str, job_id: &str) -> SchedResult<Option<QueueRecord>> {
        let args = vec![flag.to_string(), job_id.to_string()];
        let output = self
            .runner
            .output("qstat", &args)
            .await
            .map_err(|e| SchedError::QueueError {
                job_id: job_id.to_string(),
                message: e.to_string(),
            })?;

        if output.stderr.contains("Unknown Job Id") || output.stderr.contains("does not exist") {
            return Ok(None);
        }
        if !output.success() {
            return Err(SchedError::QueueError {
                job_id: job_id.to_string(),
                message: output.stderr.trim().to_string(),
            });
        }
        parser::parse_qstat_full_output(&output.stdout)
    }
}

#[async_trait]
impl QueueMonitor for TorqueQueue {
    async fn lookup(&self, job_id: &str) -> SchedResult<Option<QueueRecord>> {
        if let Some(record) = self.run_qstat("-f", job_id).await? {
            return Ok(Some(record));
        }
        // qstat -x also shows finished jobs, where the server keeps them
        match self.run_qstat("-xf", job_id).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::debug!(id = job_id, error = %e, "qstat -xf unavailable");
                Ok(None)
            }
        }
    }
}
