//! Job dependencies and the shared job handle they point at.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Deserializer};

use crate::backend::{Backend, Submission};
use crate::error::{SchedError, SchedResult};

/// Something a job has to wait for.
#[derive(Debug, Clone)]
pub enum Dependency {
    /// Another job. Required for local jobs.
    Job(JobRef),
    /// A batch scheduler id. Only meaningful to batch backends.
    Id(String),
}

impl Dependency {
    /// Parse a numeric batch id.
    pub fn parse(value: &str) -> SchedResult<Self> {
        let value = value.trim();
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(SchedError::InvalidDependency(value.to_string()));
        }
        Ok(Dependency::Id(value.to_string()))
    }

    /// Parse a comma or whitespace separated list of batch ids.
    pub fn parse_list(value: &str) -> SchedResult<Vec<Self>> {
        let ids: Vec<&str> = value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(SchedError::InvalidDependency(value.to_string()));
        }
        ids.into_iter().map(Self::parse).collect()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Job(job) => match job.id() {
                Some(id) => write!(f, "{} ({id})", job.name()),
                None => write!(f, "{}", job.name()),
            },
            Dependency::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<JobRef> for Dependency {
    fn from(job: JobRef) -> Self {
        Dependency::Job(job)
    }
}

impl From<&crate::job::Job> for Dependency {
    fn from(job: &crate::job::Job) -> Self {
        Dependency::Job(job.reference())
    }
}

impl From<u64> for Dependency {
    fn from(id: u64) -> Self {
        Dependency::Id(id.to_string())
    }
}

impl From<u32> for Dependency {
    fn from(id: u32) -> Self {
        Dependency::Id(id.to_string())
    }
}

impl TryFrom<&str> for Dependency {
    type Error = SchedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Dependency {
    type Error = SchedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for Dependency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(id) => Ok(Dependency::from(id)),
            RawId::Text(id) => Dependency::parse(&id).map_err(serde::de::Error::custom),
        }
    }
}

/// Shared lifecycle record of one job.
pub(crate) struct Tracker {
    name: String,
    id: OnceLock<String>,
    submission: Mutex<Option<(Arc<dyn Backend>, Submission)>>,
    done: AtomicBool,
}

impl Tracker {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: OnceLock::new(),
            submission: Mutex::new(None),
            done: AtomicBool::new(false),
        }
    }

    pub(crate) fn record_submission(&self, backend: Arc<dyn Backend>, submission: Submission) {
        if let Some(id) = submission.batch_id() {
            // The id is assigned once; a second submission keeps the first.
            let _ = self.id.set(id.to_string());
        }
        *self
            .submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((backend, submission));
    }

    pub(crate) fn submission(&self) -> Option<(Arc<dyn Backend>, Submission)> {
        self.submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn id(&self) -> Option<&str> {
        self.id.get().map(String::as_str)
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }
}

/// A cheap, cloneable view of a job, used to express dependencies.
#[derive(Clone)]
pub struct JobRef {
    tracker: Arc<Tracker>,
}

impl JobRef {
    pub(crate) fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    /// Name of the job.
    pub fn name(&self) -> &str {
        &self.tracker.name
    }

    /// Batch id, once the job has been submitted to a scheduler.
    pub fn id(&self) -> Option<&str> {
        self.tracker.id()
    }

    /// Whether the job has been submitted.
    pub fn is_submitted(&self) -> bool {
        self.tracker.submission().is_some()
    }

    /// Whether the job is known to have finished.
    pub fn is_done(&self) -> bool {
        self.tracker.is_done()
    }

    /// Block until the job has finished.
    pub async fn wait(&self) -> SchedResult<()> {
        if self.is_done() {
            return Ok(());
        }
        let (backend, submission) = self
            .tracker
            .submission()
            .ok_or_else(|| SchedError::DependencyNotSubmitted(self.name().to_string()))?;
        backend.wait(&submission).await?;
        self.tracker.mark_done();
        Ok(())
    }
}

impl fmt::Debug for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRef")
            .field("name", &self.name())
            .field("id", &self.id())
            .field("done", &self.is_done())
            .finish()
    }
}
