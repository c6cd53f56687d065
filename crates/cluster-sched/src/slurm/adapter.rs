//! SLURM backend for job submission and tracking.

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
use crate::slurm::parser;
use crate::slurm::queue::SlurmQueue;
use crate::slurm::templates;

/// Submits jobs through `sbatch`.
pub struct SlurmBackend {
    runner: Arc<dyn CommandRunner>,
    queue: Arc<dyn QueueMonitor>,
    retry: RetryPolicy,
    poll_interval: Duration,
}

impl SlurmBackend {
    /// Create a SLURM backend running commands with `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let queue = Arc::new(SlurmQueue::new(Arc::clone(&runner)));
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

    /// Use a different retry policy for `sbatch`.
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

impl Default for SlurmBackend {
    fn default() -> Self {
        Self::new(Arc::new(ShellRunner::new()))
    }
}

/// `sbatch` arguments expressing an afterok dependency on every id.
pub fn dependency_args(ids: &[String]) -> Vec<String> {
    if ids.is_empty() {
        return Vec::new();
    }
    vec![format!("--dependency=afterok:{}", ids.join(":"))]
}

#[async_trait]
impl Backend for SlurmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Slurm
    }

    fn build_scripts(&self, spec: &ScriptSpec<'_>) -> ScriptSet {
        let exec_path = spec.file(Some("script"));
        ScriptSet {
            submission: RenderedScript {
                path: spec.file(Some("sbatch")),
                text: templates::generate_batch_script(spec, &exec_path),
            },
            execution: Some(RenderedScript {
                path: exec_path,
                text: templates::generate_exec_script(spec),
            }),
        }
    }

    fn generated_extensions(&self, suffix: &str) -> Vec<String> {
        vec![
            format!(".{suffix}.err"),
            format!(".{suffix}.out"),
            format!(".{suffix}.sbatch"),
            format!(".{suffix}.script"),
        ]
    }

    async fn submit(&self, request: SubmitRequest<'_>) -> SchedResult<Submission> {
        let ids = batch_dependency_ids(request.dependencies)?;

        let mut args = dependency_args(&ids);
        args.push(request.script.display().to_string());

        let stdout = invoke_with_retry(self.runner.as_ref(), self.retry, "sbatch", &args).await?;
        let id = parser::parse_sbatch_output(&stdout)?;

        tracing::info!(
            job = request.name,
            slurm_id = %id,
            dependencies = ?ids,
            "Submitted to SLURM"
        );
        Ok(Submission::Batch { id })
    }

    async fn wait(&self, submission: &Submission) -> SchedResult<Outcome> {
        match submission {
            Submission::Batch { id } => {
                let record = self.queue.wait_for(id, self.poll_interval).await?;
                tracing::debug!(slurm_id = %id, state = %record.state, "SLURM job finished");
                Ok(Outcome::Batch(record))
            }
            Submission::Local(pending) => Ok(Outcome::Local(pending.wait().await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Dependency;
    use crate::error::{SchedError, SchedResult};
    use crate::queue::{QueueRecord, QueueState};
    use crate::runner::CommandOutput;
    use crate::script::Resources;
    use std::path::Path;
    use std::sync::Mutex;

    /// Records every invocation and answers like sbatch.
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn output(&self, program: &str, args: &[String]) -> SchedResult<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            Ok(CommandOutput {
                exit_code: Some(0),
                stdout: "Submitted batch job 4521\n".to_string(),
                stderr: String::new(),
            })
        }

        async fn run(
            &self,
            _command: &str,
            _stdout: Option<&Path>,
            _stderr: Option<&Path>,
        ) -> SchedResult<CommandOutput> {
            unreachable!()
        }
    }

    struct FinishedQueue;

    #[async_trait]
    impl QueueMonitor for FinishedQueue {
        async fn lookup(&self, job_id: &str) -> SchedResult<Option<QueueRecord>> {
            Ok(Some(
                QueueRecord::new(job_id, QueueState::Completed).with_exit_code(0),
            ))
        }
    }

    fn request<'a>(deps: &'a [Dependency]) -> SubmitRequest<'a> {
        SubmitRequest {
            script: Path::new("/work/align.cluster.sbatch"),
            name: "align",
            outfile: Path::new("/work/align.cluster.out"),
            errfile: Path::new("/work/align.cluster.err"),
            dependencies: deps,
            threads: None,
        }
    }

    #[test]
    fn test_dependency_args() {
        assert!(dependency_args(&[]).is_empty());
        assert_eq!(
            dependency_args(&["101".to_string(), "102".to_string()]),
            vec!["--dependency=afterok:101:102"]
        );
    }

    #[tokio::test]
    async fn test_submit_passes_dependencies() {
        let runner = Arc::new(RecordingRunner::default());
        let backend = SlurmBackend::new(runner.clone());
        let deps = vec![Dependency::Id("101".into()), Dependency::Id("102".into())];

        let submission = backend.submit(request(&deps)).await.unwrap();
        assert_eq!(submission.batch_id(), Some("4521"));

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sbatch");
        assert_eq!(
            calls[0].1,
            vec!["--dependency=afterok:101:102", "/work/align.cluster.sbatch"]
        );
    }

    #[tokio::test]
    async fn test_unsubmitted_job_dependency_fails() {
        use crate::dependency::{JobRef, Tracker};

        let backend = SlurmBackend::new(Arc::new(RecordingRunner::default()));
        let deps = vec![Dependency::Job(JobRef::new(Arc::new(Tracker::new("index"))))];
        let err = backend.submit(request(&deps)).await.unwrap_err();
        assert!(matches!(err, SchedError::DependencyNotSubmitted(name) if name == "index"));
    }

    #[tokio::test]
    async fn test_wait_uses_queue() {
        let backend = SlurmBackend::new(Arc::new(RecordingRunner::default()))
            .with_queue(Arc::new(FinishedQueue));
        let outcome = backend
            .wait(&Submission::Batch {
                id: "4521".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.exit_code(), Some(0));
    }

    #[test]
    fn test_build_scripts() {
        let backend = SlurmBackend::default();
        let resources = Resources::default();
        let spec = ScriptSpec {
            name: "align",
            command: "bwa mem ref.fa reads.fq",
            dir: Path::new("/work"),
            suffix: "cluster",
            resources: &resources,
        };
        let scripts = backend.build_scripts(&spec);
        assert_eq!(
            scripts.submission.path,
            Path::new("/work/align.cluster.sbatch")
        );
        let exec = scripts.execution.unwrap();
        assert_eq!(exec.path, Path::new("/work/align.cluster.script"));
        assert!(
            scripts
                .submission
                .text
                .contains("srun bash /work/align.cluster.script")
        );
        assert!(exec.text.contains("bwa mem ref.fa reads.fq"));
    }
}
