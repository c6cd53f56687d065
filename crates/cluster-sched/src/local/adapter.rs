//! Local backend: the worker pool behind the [`Backend`] interface.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::backend::{Backend, BackendKind, Outcome, Submission, SubmitRequest};
use crate::dependency::Dependency;
use crate::error::{SchedError, SchedResult};
use crate::local::pool::{WorkerPool, default_pool_size};
use crate::local::templates;
use crate::runner::{CommandRunner, ShellRunner};
use crate::script::{RenderedScript, ScriptSet, ScriptSpec};

/// Runs jobs on a local worker pool.
///
/// The pool is created on first use and created again after
/// [`LocalBackend::shutdown`].
pub struct LocalBackend {
    runner: Arc<dyn CommandRunner>,
    threads: Option<usize>,
    pool: Mutex<Option<WorkerPool>>,
}

impl LocalBackend {
    /// Create a local backend running commands with `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            threads: None,
            pool: Mutex::new(None),
        }
    }

    /// Default pool size when a job does not ask for one.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// The current pool, created if absent or shut down.
    pub fn pool(&self, threads: Option<usize>) -> WorkerPool {
        let mut slot = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(pool) if !pool.is_closed() => pool.clone(),
            _ => {
                let size = threads.or(self.threads).unwrap_or_else(default_pool_size);
                let pool = WorkerPool::new(size, Arc::clone(&self.runner));
                *slot = Some(pool.clone());
                pool
            }
        }
    }

    /// Shut the current pool down, if there is one.
    pub fn shutdown(&self) {
        if let Some(pool) = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pool.shutdown();
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(Arc::new(ShellRunner::new()))
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn build_scripts(&self, spec: &ScriptSpec<'_>) -> ScriptSet {
        ScriptSet {
            submission: RenderedScript {
                path: spec.file(None),
                text: templates::generate_local_script(spec),
            },
            execution: None,
        }
    }

    fn generated_extensions(&self, suffix: &str) -> Vec<String> {
        vec![
            format!(".{suffix}.err"),
            format!(".{suffix}.out"),
            format!(".{suffix}"),
        ]
    }

    async fn submit(&self, request: SubmitRequest<'_>) -> SchedResult<Submission> {
        // Check every dependency before blocking on any of them.
        let mut upstream = Vec::with_capacity(request.dependencies.len());
        for dependency in request.dependencies {
            match dependency {
                Dependency::Job(job) => upstream.push(job),
                Dependency::Id(id) => return Err(SchedError::LocalDependency(id.clone())),
            }
        }

        // Blocks the caller until every upstream job has finished.
        for job in upstream {
            if !job.is_done() {
                tracing::info!(
                    job = request.name,
                    dependency = job.name(),
                    "Waiting for dependency"
                );
                job.wait().await?;
            }
        }

        let command = format!("bash {}", request.script.display());
        let pending = self.pool(request.threads).submit(
            command,
            Some(request.outfile.to_path_buf()),
            Some(request.errfile.to_path_buf()),
        )?;

        tracing::info!(job = request.name, "Queued on local worker pool");
        Ok(Submission::Local(pending))
    }

    async fn wait(&self, submission: &Submission) -> SchedResult<Outcome> {
        match submission {
            Submission::Local(pending) => Ok(Outcome::Local(pending.wait().await?)),
            Submission::Batch { id } => Err(SchedError::ConfigError(format!(
                "The local backend cannot track batch job {id}"
            ))),
        }
    }
}
