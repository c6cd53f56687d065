//! Shared configuration and helpers for the commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cluster_sched::{Backend, BackendKind, ClusterConfig, JobOutput, JobOptions};
use console::style;

/// Loaded configuration plus the backend built from it.
pub struct Settings {
    pub config: ClusterConfig,
    pub backend: Arc<dyn Backend>,
}

impl Settings {
    /// Load `path` (or the defaults) and apply a backend override.
    pub fn load(path: Option<&Path>, backend: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => ClusterConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ClusterConfig::default(),
        };
        if let Some(backend) = backend {
            config = config.with_backend(backend.parse::<BackendKind>()?);
        }
        tracing::debug!(?config, "Loaded configuration");

        let backend = config.build_backend();
        Ok(Self { config, backend })
    }

    /// Job options from `key=value` pairs, on top of the configured suffix.
    pub fn options(&self, pairs: &[String]) -> Result<JobOptions> {
        let mut options = JobOptions::new().with_suffix(&self.config.suffix);
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Expected KEY=VALUE, got {pair:?}"))?;
            options.set(key.trim(), value.trim())?;
        }
        Ok(options)
    }
}

/// Print what a finished job produced.
pub fn print_output(name: &str, output: &JobOutput) {
    let code = match output.exit_code {
        Some(0) => style("0".to_string()).green(),
        Some(code) => style(code.to_string()).red(),
        None => style("unknown".to_string()).yellow(),
    };
    println!("{} {} exited with {}", style("✓").green().bold(), name, code);

    if let Some(ref stdout) = output.stdout {
        if !stdout.is_empty() {
            println!("{}", style("stdout:").dim());
            print!("{stdout}");
        }
    }
    if let Some(ref stderr) = output.stderr {
        if !stderr.is_empty() {
            println!("{}", style("stderr:").dim());
            print!("{stderr}");
        }
    }
}
