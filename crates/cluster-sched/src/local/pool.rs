//! Fixed-size worker pool for local jobs.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Semaphore;

use crate::error::{SchedError, SchedResult};
use crate::runner::{CommandOutput, CommandRunner};

type SharedOutput = Shared<BoxFuture<'static, Result<CommandOutput, String>>>;

/// Number of workers used when none is configured.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Result of a command queued on the pool.
///
/// Clones share the same underlying task, so any number of waiters can
/// observe one result.
#[derive(Clone)]
pub struct PendingResult {
    inner: SharedOutput,
}

impl PendingResult {
    /// Wait for the command to finish.
    pub async fn wait(&self) -> SchedResult<CommandOutput> {
        self.inner.clone().await.map_err(SchedError::PoolTask)
    }

    /// Whether the result is already available.
    pub fn is_ready(&self) -> bool {
        self.inner.peek().is_some()
    }
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("ready", &self.is_ready())
            .finish()
    }
}

struct PoolInner {
    size: usize,
    permits: Arc<Semaphore>,
    runner: Arc<dyn CommandRunner>,
}

/// A pool running at most `size` commands at a time.
///
/// Cloning the pool shares it. After [`WorkerPool::shutdown`] no new
/// commands are accepted and commands still waiting for a worker fail.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Create a pool with `size` workers (at least one).
    pub fn new(size: usize, runner: Arc<dyn CommandRunner>) -> Self {
        let size = size.max(1);
        tracing::debug!(size, "Starting worker pool");
        Self {
            inner: Arc::new(PoolInner {
                size,
                permits: Arc::new(Semaphore::new(size)),
                runner,
            }),
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Whether the pool has been shut down.
    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    /// Stop accepting commands.
    pub fn shutdown(&self) {
        tracing::debug!(size = self.inner.size, "Shutting down worker pool");
        self.inner.permits.close();
    }

    /// Queue a shell command. Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        command: String,
        stdout: Option<PathBuf>,
        stderr: Option<PathBuf>,
    ) -> SchedResult<PendingResult> {
        if self.is_closed() {
            return Err(SchedError::PoolClosed);
        }

        let permits = Arc::clone(&self.inner.permits);
        let runner = Arc::clone(&self.inner.runner);
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| SchedError::PoolClosed)?;
            runner
                .run(&command, stdout.as_deref(), stderr.as_deref())
                .await
        });

        let inner = async move {
            match handle.await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(e.to_string()),
            }
        }
        .boxed()
        .shared();

        Ok(PendingResult { inner })
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.inner.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}
