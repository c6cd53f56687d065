//! Clean command implementation.

use std::path::Path;

use anyhow::Result;
use cluster_sched::clean_dir;
use console::style;

use super::common::Settings;

/// Execute the clean command.
pub async fn execute(settings: &Settings, dir: &Path, suffix: Option<&str>) -> Result<()> {
    let suffix = suffix.unwrap_or(&settings.config.suffix);
    let deleted = clean_dir(settings.backend.as_ref(), dir, suffix).await?;

    if deleted.is_empty() {
        println!("{} Nothing to clean in {}", style("·").dim(), dir.display());
    }
    for file in &deleted {
        println!("{} Removed {file}", style("✗").red());
    }
    Ok(())
}
