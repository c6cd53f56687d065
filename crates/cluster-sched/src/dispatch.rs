//! File-level entry points.
//!
//! Thin wrappers over [`Job`] for the common one-shot cases, plus the
//! job-independent [`submit_file`] and [`clean_dir`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::backend::{Backend, Submission, SubmitRequest};
use crate::dependency::Dependency;
use crate::error::{SchedError, SchedResult};
use crate::job::{Job, JobBuilder};
use crate::script::{DEFAULT_SUFFIX, job_file};

/// Build a job without writing anything.
pub fn make_job(backend: Arc<dyn Backend>, job: JobBuilder) -> SchedResult<Job> {
    job.build(backend)
}

/// Build a job, write its scripts, and return the submission script path.
pub async fn make_job_file(backend: Arc<dyn Backend>, job: JobBuilder) -> SchedResult<PathBuf> {
    let mut job = job.build(backend)?;
    job.write(true).await?;
    Ok(job.submission().path().to_path_buf())
}

/// Build, write and submit a job.
pub async fn submit(backend: Arc<dyn Backend>, job: JobBuilder) -> SchedResult<Job> {
    let mut job = job.build(backend)?;
    job.write(true).await?;
    job.submit(None).await?;
    Ok(job)
}

/// Clean every job in `jobs`.
pub async fn clean(jobs: &mut [Job]) -> SchedResult<()> {
    for job in jobs {
        job.clean().await?;
    }
    Ok(())
}

/// Submit an existing script.
///
/// Batch backends receive the script as-is; the local backend runs it with
/// `bash` and captures output next to it in `<name>.cluster.out` and
/// `<name>.cluster.err`. `name` defaults to the script's file stem.
pub async fn submit_file(
    backend: &dyn Backend,
    script: &Path,
    name: Option<&str>,
    dependencies: &[Dependency],
    threads: Option<usize>,
) -> SchedResult<Submission> {
    let script = std::path::absolute(script)?;
    let name = match name {
        Some(name) => name.to_string(),
        None => script
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SchedError::ConfigError(format!("Not a script file: {}", script.display()))
            })?,
    };
    let dir = script.parent().unwrap_or(Path::new("/"));
    let outfile = job_file(dir, &name, DEFAULT_SUFFIX, Some("out"));
    let errfile = job_file(dir, &name, DEFAULT_SUFFIX, Some("err"));

    let submission = backend
        .submit(SubmitRequest {
            script: &script,
            name: &name,
            outfile: &outfile,
            errfile: &errfile,
            dependencies,
            threads,
        })
        .await?;

    tracing::info!(
        script = %script.display(),
        id = submission.batch_id().unwrap_or("local"),
        "Submitted script"
    );
    Ok(submission)
}

/// Delete every file in `dir` that this backend generates for `suffix`.
///
/// Not recursive; only regular files are touched. Returns the deleted file
/// names, sorted.
pub async fn clean_dir(backend: &dyn Backend, dir: &Path, suffix: &str) -> SchedResult<Vec<String>> {
    let extensions = backend.generated_extensions(suffix);
    let mut deleted = Vec::new();

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if extensions.iter().any(|ext| file_name.ends_with(ext.as_str())) {
            fs::remove_file(entry.path()).await?;
            deleted.push(file_name);
        }
    }

    if deleted.is_empty() {
        tracing::debug!(dir = %dir.display(), "No files to clean");
    } else {
        tracing::info!(dir = %dir.display(), count = deleted.len(), "Cleaned generated files");
    }
    deleted.sort();
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalBackend;
    use crate::slurm::SlurmBackend;
    use crate::torque::TorqueBackend;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), "").unwrap();
        }
    }

    #[tokio::test]
    async fn test_clean_dir_slurm() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            &[
                "a.cluster.out",
                "a.cluster.err",
                "a.cluster.sbatch",
                "a.cluster.script",
                "a.cluster.qsub",
                "a.cluster",
                "notes.txt",
            ],
        );
        std::fs::create_dir(dir.path().join("nested.cluster.out")).unwrap();

        let deleted = clean_dir(&SlurmBackend::default(), dir.path(), "cluster")
            .await
            .unwrap();
        assert_eq!(
            deleted,
            vec![
                "a.cluster.err",
                "a.cluster.out",
                "a.cluster.sbatch",
                "a.cluster.script"
            ]
        );
        assert!(dir.path().join("a.cluster.qsub").exists());
        assert!(dir.path().join("a.cluster").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("nested.cluster.out").is_dir());
    }

    #[tokio::test]
    async fn test_clean_dir_per_backend() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["b.cluster", "b.cluster.qsub", "b.run.out"]);

        let deleted = clean_dir(&TorqueBackend::default(), dir.path(), "cluster")
            .await
            .unwrap();
        assert_eq!(deleted, vec!["b.cluster.qsub"]);

        let deleted = clean_dir(&LocalBackend::default(), dir.path(), "cluster")
            .await
            .unwrap();
        assert_eq!(deleted, vec!["b.cluster"]);

        let deleted = clean_dir(&LocalBackend::default(), dir.path(), "run")
            .await
            .unwrap();
        assert_eq!(deleted, vec!["b.run.out"]);
    }

    #[tokio::test]
    async fn test_clean_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let deleted = clean_dir(&LocalBackend::default(), dir.path(), "cluster")
            .await
            .unwrap();
        assert!(deleted.is_empty());
    }
}
