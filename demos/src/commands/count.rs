//! Count command implementation.
//!
//! Packages [`count_words`] once per file and collects the returned values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cluster_sched::{FunctionArgs, FunctionCall, Job};
use console::style;

use super::common::Settings;
use crate::tasks::count_words;

/// Execute the count command.
pub async fn execute(settings: &Settings, files: &[PathBuf], dir: &Path) -> Result<()> {
    let mut jobs = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let file = std::path::absolute(file)
            .with_context(|| format!("Cannot resolve {}", file.display()))?;
        let call = FunctionCall::new(
            count_words,
            FunctionArgs::new().with_arg(file.display().to_string()),
        )?;
        let mut job = Job::builder(call)
            .name(format!("count_words_{index}"))
            .path(dir)
            .options(settings.options(&[])?)
            .build(settings.backend.clone())?;
        job.submit(None).await?;
        println!("{} {job}", style("→").cyan().bold());
        jobs.push(job);
    }

    for job in &mut jobs {
        let value = job.function_result().await?;
        println!(
            "{} {}: {}",
            style("✓").green().bold(),
            job.name(),
            serde_json::to_string_pretty(&value)?
        );
    }

    cluster_sched::clean(&mut jobs).await?;
    Ok(())
}
