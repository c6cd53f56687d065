//! Torque backend for job submission and tracking.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{
    Backend, BackendKind, Outcome, RetryPolicy, Submission, SubmitRequest, batch_dependency_ids,
    invoke_with_retry,
};
use crate::error::SchedResult;
use crate::queue::{DEFAULT_POLL_INTERVAL, QueueMonitor};
use crate::runner::{CommandRunner, ShellRunner};
use crate::script::{RenderedScript, ScriptSet, ScriptSpec};
use crate::torque::parser;
use crate::torque::queue::TorqueQueue;
use crate::torque::templates;

/// Submits jobs through `qsub`.
pub struct TorqueBackend {
    runner: Arc<dyn CommandRunner>,
    queue: Arc<dyn QueueMonitor>,
    retry: RetryPolicy,
    poll_interval: Duration,
}

impl TorqueBackend {
    /// Create a Torque backend running commands with `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let queue = Arc::new(TorqueQueue::new(Arc::clone(&runner)));
        Self {
            runner,
            queue,
            retry: RetryPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Use a different queue lookup service.
    pub fn with_queue(mut self, queue: Arc<dyn QueueMonitor>) -> Self {
        self.queue = queue;
        self
    }

    /// Use a different retry policy for `qsub`.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use a different queue poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for TorqueBackend {
    fn default() -> Self {
        Self::new(Arc::new(ShellRunner::new()))
    }
}

/// `qsub` arguments expressing an afterok dependency on every id.
pub fn dependency_args(ids: &[String]) -> Vec<String> {
    if ids.is_empty() {
        return Vec::new();
    }
    let depends: Vec<String> = ids.iter().map(|id| format!("afterok:{id}")).collect();
    vec!["-W".to_string(), format!("depend={}", depends.join(","))]
}

#[async_trait]
impl Backend for TorqueBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Torque
    }

    fn build_scripts(&self, spec: &ScriptSpec<'_>) -> ScriptSet {
        ScriptSet {
            submission: RenderedScript {
                path: spec.file(Some("qsub")),
                text: templates::generate_batch_script(spec),
            },
            execution: None,
        }
    }

    fn generated_extensions(&self, suffix: &str) -> Vec<String> {
        vec![
            format!(".{suffix}.err"),
            format!(".{suffix}.out"),
            format!(".{suffix}.qsub"),
        ]
    }

    async fn submit(&self, request: SubmitRequest<'_>) -> SchedResult<Submission> {
        let ids = batch_dependency_ids(request.dependencies)?;

        let mut args = dependency_args(&ids);
        args.push(request.script.display().to_string());

        let stdout = invoke_with_retry(self.runner.as_ref(), self.retry, "qsub", &args).await?;
        let id = parser::parse_qsub_output(&stdout)?;

        tracing::info!(
            job = request.name,
            torque_id = %id,
            dependencies = ?ids,
            "Submitted to Torque"
        );
        Ok(Submission::Batch { id })
    }

    async fn wait(&self, submission: &Submission) -> SchedResult<Outcome> {
        match submission {
            Submission::Batch { id } => {
                let record = self.queue.wait_for(id, self.poll_interval).await?;
                tracing::debug!(torque_id = %id, state = %record.state, "Torque job finished");
                Ok(Outcome::Batch(record))
            }
            Submission::Local(pending) => Ok(Outcome::Local(pending.wait().await?)),
        }
    }
}
