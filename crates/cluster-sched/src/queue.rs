//! Queue lookup interface used while waiting on batch jobs.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedResult;

/// Default interval between queue polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Scheduler-neutral job state as reported by a queue lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueState {
    /// Waiting for resources or dependencies.
    Pending,
    /// Held by the user or an administrator.
    Held,
    /// Running.
    Running,
    /// Finishing up (slurm `COMPLETING`, torque `E`).
    Completing,
    /// Suspended.
    Suspended,
    /// Finished; check the exit code for success.
    Completed,
    /// Failed.
    Failed,
    /// Cancelled.
    Cancelled,
    /// Hit its walltime.
    Timeout,
    /// A state we do not recognise.
    Unknown(String),
}

impl QueueState {
    /// Whether the job is still in the queue's active set.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            QueueState::Pending
                | QueueState::Held
                | QueueState::Running
                | QueueState::Completing
                | QueueState::Suspended
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueState::Completed
                | QueueState::Failed
                | QueueState::Cancelled
                | QueueState::Timeout
        )
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueState::Pending => write!(f, "pending"),
            QueueState::Held => write!(f, "held"),
            QueueState::Running => write!(f, "running"),
            QueueState::Completing => write!(f, "completing"),
            QueueState::Suspended => write!(f, "suspended"),
            QueueState::Completed => write!(f, "completed"),
            QueueState::Failed => write!(f, "failed"),
            QueueState::Cancelled => write!(f, "cancelled"),
            QueueState::Timeout => write!(f, "timeout"),
            QueueState::Unknown(state) => write!(f, "unknown ({state})"),
        }
    }
}

/// A snapshot of one job in the batch queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// Batch job id.
    pub id: String,
    /// Job name as the scheduler knows it.
    pub name: Option<String>,
    /// Current state.
    pub state: QueueState,
    /// Exit code, when the scheduler reports one.
    pub exit_code: Option<i32>,
    /// When this snapshot was taken.
    pub observed_at: DateTime<Utc>,
}

impl QueueRecord {
    /// A record observed now.
    pub fn new(id: impl Into<String>, state: QueueState) -> Self {
        Self {
            id: id.into(),
            name: None,
            state,
            exit_code: None,
            observed_at: Utc::now(),
        }
    }

    /// Set the exit code.
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    /// Set the job name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record for a job that left the queue without a terminal record.
    ///
    /// Such jobs count as completed; the exit code is unknown.
    pub fn vanished(id: impl Into<String>) -> Self {
        Self::new(id, QueueState::Completed)
    }
}

/// Looks up batch jobs by id.
#[async_trait]
pub trait QueueMonitor: Send + Sync {
    /// Current record for `job_id`, or `None` when the queue no longer knows it.
    async fn lookup(&self, job_id: &str) -> SchedResult<Option<QueueRecord>>;

    /// Poll until the job reaches a terminal state and return the last snapshot.
    ///
    /// Unrecognised states keep the poll going. A job that disappears from
    /// the queue is treated as completed. There is no timeout.
    async fn wait_for(&self, job_id: &str, poll_interval: Duration) -> SchedResult<QueueRecord> {
        loop {
            match self.lookup(job_id).await? {
                Some(record) if record.state.is_terminal() => return Ok(record),
                Some(QueueRecord {
                    state: QueueState::Unknown(state),
                    ..
                }) => {
                    tracing::debug!(
                        id = job_id,
                        state = %state,
                        "Unrecognised job state, still polling"
                    );
                }
                Some(record) => {
                    tracing::debug!(id = job_id, state = %record.state, "Job still active");
                }
                None => {
                    tracing::debug!(id = job_id, "Job left the queue, treating as complete");
                    return Ok(QueueRecord::vanished(job_id));
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
