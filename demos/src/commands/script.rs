//! Script command implementation.
//!
//! Submits a script file as-is, bypassing job construction.

use std::path::Path;

use anyhow::Result;
use cluster_sched::{Dependency, Submission, submit_file};
use console::style;

use super::common::Settings;

/// Execute the script command.
pub async fn execute(
    settings: &Settings,
    path: &Path,
    name: Option<&str>,
    depends: &[String],
) -> Result<()> {
    let dependencies = depends
        .iter()
        .map(|id| Dependency::parse(id))
        .collect::<Result<Vec<_>, _>>()?;

    let submission = submit_file(
        settings.backend.as_ref(),
        path,
        name,
        &dependencies,
        settings.config.threads,
    )
    .await?;

    match submission {
        Submission::Batch { ref id } => {
            println!(
                "{} Submitted {} as job {}",
                style("→").cyan().bold(),
                style(path.display()).green(),
                style(id).yellow()
            );
        }
        Submission::Local(_) => {
            let outcome = settings.backend.wait(&submission).await?;
            println!(
                "{} {} exited with {:?}",
                style("✓").green().bold(),
                style(path.display()).green(),
                outcome.exit_code()
            );
        }
    }

    Ok(())
}
