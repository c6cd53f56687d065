//! Run command implementation.
//!
//! Submits one shell command and optionally waits for it.

use std::path::Path;

use anyhow::Result;
use cluster_sched::Job;
use console::style;

use super::common::{Settings, print_output};

/// Execute the run command.
pub async fn execute(
    settings: &Settings,
    command: &[String],
    name: Option<&str>,
    options: &[String],
    dir: &Path,
    wait: bool,
    clean: bool,
) -> Result<()> {
    let mut builder = Job::builder(command.join(" "))
        .path(dir)
        .options(settings.options(options)?);
    if let Some(name) = name {
        builder = builder.name(name);
    }
    let mut job = builder.build(settings.backend.clone())?;

    println!(
        "{} Submitting {} to {}",
        style("→").cyan().bold(),
        style(job.command()).green(),
        style(job.kind()).magenta()
    );
    job.submit(None).await?;
    println!("  {job}");

    if wait {
        let output = job.get().await?;
        print_output(job.name(), &output);
    }
    if clean {
        job.clean().await?;
        println!("  Removed scripts for {}", job.name());
    }

    Ok(())
}
