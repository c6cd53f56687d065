//! Chain command implementation.
//!
//! Each step appends to a shared log once the previous step has finished,
//! so the log shows the order the backend honored.

use std::path::Path;

use anyhow::Result;
use cluster_sched::Job;
use console::style;

use super::common::{Settings, print_output};

/// Execute the chain command.
pub async fn execute(settings: &Settings, steps: usize, dir: &Path) -> Result<()> {
    let log = std::path::absolute(dir)?.join("chain.log");
    let mut jobs: Vec<Job> = Vec::with_capacity(steps);

    for step in 1..=steps {
        let mut options = settings.options(&[])?;
        if let Some(previous) = jobs.last() {
            options = options.depends_on(previous);
        }
        let mut job = Job::builder(format!("echo step {step} >> {}", log.display()))
            .name(format!("step_{step}"))
            .path(dir)
            .options(options)
            .build(settings.backend.clone())?;
        job.submit(None).await?;
        println!("{} {job}", style("→").cyan().bold());
        jobs.push(job);
    }

    if let Some(last) = jobs.last_mut() {
        let output = last.get().await?;
        print_output(last.name(), &output);
    }
    if let Ok(contents) = tokio::fs::read_to_string(&log).await {
        println!("{}", style("chain.log:").dim());
        print!("{contents}");
    }

    cluster_sched::clean(&mut jobs).await?;
    Ok(())
}
