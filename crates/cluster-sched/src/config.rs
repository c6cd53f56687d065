//! Configuration for building backends.
//!
//! A [`ClusterConfig`] can be loaded from YAML:
//!
//! ```yaml
//! backend: slurm
//! suffix: cluster
//! poll_interval_secs: 5
//! submit_retries: 5
//! retry_delay_secs: 1
//! ```
//!
//! or built in code with the `with_*` methods. Every field has a default.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, BackendKind, RetryPolicy};
use crate::error::{SchedError, SchedResult};
use crate::local::LocalBackend;
use crate::runner::{CommandRunner, ShellRunner};
use crate::script::DEFAULT_SUFFIX;
use crate::slurm::SlurmBackend;
use crate::torque::TorqueBackend;

/// Backend selection and tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    /// Which backend to drive.
    pub backend: BackendKind,

    /// Default suffix of generated file names.
    pub suffix: String,

    /// Local worker pool size; all cores when unset.
    pub threads: Option<usize>,

    /// Seconds between queue polls while waiting on batch jobs.
    pub poll_interval_secs: u64,

    /// Retries after a failed submit command.
    pub submit_retries: u32,

    /// Seconds between submit attempts.
    pub retry_delay_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            suffix: DEFAULT_SUFFIX.to_string(),
            threads: None,
            poll_interval_secs: 2,
            submit_retries: 5,
            retry_delay_secs: 1,
        }
    }
}

impl ClusterConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> SchedResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SchedResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Check the values serde cannot.
    pub fn validate(&self) -> SchedResult<()> {
        if self.suffix.is_empty() || self.suffix.contains('/') {
            return Err(SchedError::ConfigError(format!(
                "Invalid suffix: {:?}",
                self.suffix
            )));
        }
        if self.threads == Some(0) {
            return Err(SchedError::ConfigError(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(SchedError::ConfigError(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Select the backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Set the file name suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the local pool size.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set the queue poll interval in seconds.
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Retry policy for submit commands.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.submit_retries,
            Duration::from_secs(self.retry_delay_secs),
        )
    }

    /// Interval between queue polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Build the configured backend with the default command runner.
    pub fn build_backend(&self) -> Arc<dyn Backend> {
        self.build_backend_with(Arc::new(ShellRunner::new()))
    }

    /// Build the configured backend on top of `runner`.
    pub fn build_backend_with(&self, runner: Arc<dyn CommandRunner>) -> Arc<dyn Backend> {
        tracing::debug!(backend = %self.backend, "Building backend");
        match self.backend {
            BackendKind::Local => {
                let mut backend = LocalBackend::new(runner);
                if let Some(threads) = self.threads {
                    backend = backend.with_threads(threads);
                }
                Arc::new(backend)
            }
            BackendKind::Slurm => Arc::new(
                SlurmBackend::new(runner)
                    .with_retry(self.retry_policy())
                    .with_poll_interval(self.poll_interval()),
            ),
            BackendKind::Torque => Arc::new(
                TorqueBackend::new(runner)
                    .with_retry(self.retry_policy())
                    .with_poll_interval(self.poll_interval()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.suffix, "cluster");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config = ClusterConfig::from_yaml_str(
            "backend: torque\nsuffix: run1\npoll_interval_secs: 10\nsubmit_retries: 2\n",
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Torque);
        assert_eq!(config.suffix, "run1");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.retry_policy().retries, 2);
        assert_eq!(config.retry_policy().delay, Duration::from_secs(1));
        assert_eq!(config.build_backend().kind(), BackendKind::Torque);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = ClusterConfig::from_yaml_str("backend: slurm\nqueue_name: batch\n").unwrap_err();
        assert!(matches!(err, SchedError::YamlError(_)));
        assert!(err.to_string().contains("queue_name"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ClusterConfig::from_yaml_str("backend: lsf\n").is_err());
        assert!(ClusterConfig::from_yaml_str("suffix: a/b\n").is_err());
        assert!(ClusterConfig::default().with_threads(0).validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.yaml");
        std::fs::write(&path, "backend: slurm\nthreads: 4\n").unwrap();

        let config = ClusterConfig::from_file(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Slurm);
        assert_eq!(config.threads, Some(4));
        assert!(ClusterConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
