//! Local Backend Integration Tests
//!
//! These tests run real `bash` scripts on the local worker pool and check
//! the files a job leaves behind at each step of its lifecycle.

use std::path::Path;
use std::sync::Arc;

use cluster_sched::{
    Backend, Dependency, Job, JobOptions, JobState, LocalBackend, SchedError, clean_dir,
    make_job_file, submit_file,
};

fn local(threads: usize) -> Arc<dyn Backend> {
    Arc::new(LocalBackend::default().with_threads(threads))
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_write_exists_clean() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::builder("echo hello")
        .path(dir.path())
        .build(local(1))
        .unwrap();

    assert!(!job.submission().exists());
    job.write(true).await.unwrap();
    assert!(job.submission().exists());
    assert_eq!(job.state(), JobState::Written);
    assert_eq!(dir_entries(dir.path()), vec!["echo.cluster"]);

    job.clean().await.unwrap();
    assert!(!job.submission().exists());
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_write_without_overwrite_keeps_content() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("echo.cluster");
    std::fs::write(&script, "#!/bin/bash\necho handwritten\n").unwrap();

    let mut job = Job::builder("echo generated")
        .path(dir.path())
        .build(local(1))
        .unwrap();
    job.write(false).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&script).unwrap(),
        "#!/bin/bash\necho handwritten\n"
    );
}

#[tokio::test]
async fn test_unknown_option_fails_before_any_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = JobOptions::from_pairs([("cores", "2"), ("bogus_option", "1")]).and_then(|options| {
        Job::builder("echo never")
            .path(dir.path())
            .options(options)
            .build(local(1))
    });

    assert!(matches!(result, Err(SchedError::UnrecognizedOption(name)) if name == "bogus_option"));
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_submit_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::builder("echo")
        .args(["out-line", "&&", "echo", "err-line", ">&2"])
        .name("talk")
        .path(dir.path())
        .build(local(2))
        .unwrap();

    job.submit(None).await.unwrap();
    assert!(job.is_submitted());
    assert!(job.id().is_none());

    let output = job.get().await.unwrap();
    assert_eq!(output.exit_code, Some(0));
    assert!(output.stdout.as_deref().unwrap().contains("Running talk"));
    assert!(output.stdout.as_deref().unwrap().contains("out-line"));
    assert!(output.stderr.as_deref().unwrap().contains("err-line"));
    assert_eq!(job.state(), JobState::Done);

    let captured = std::fs::read_to_string(dir.path().join("talk.cluster.out")).unwrap();
    assert!(captured.contains("out-line"));
}

#[tokio::test]
async fn test_failing_command_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::builder("false")
        .path(dir.path())
        .build(local(1))
        .unwrap();

    job.submit(None).await.unwrap();
    let output = job.get().await.unwrap();
    // The wrapper reports the failure on stderr and exits normally.
    assert!(
        output
            .stderr
            .as_deref()
            .unwrap()
            .contains("Exited with code: 1")
    );
}

#[tokio::test]
async fn test_local_dependency_ordering() {
    let dir = tempfile::tempdir().unwrap();
    let backend = local(2);

    let mut first = Job::builder("sleep 0.3 && echo first >> order.txt")
        .name("first")
        .path(dir.path())
        .build(backend.clone())
        .unwrap();
    let mut second = Job::builder("echo second >> order.txt")
        .name("second")
        .path(dir.path())
        .options(JobOptions::new().depends_on(&first))
        .build(backend)
        .unwrap();

    first.submit(None).await.unwrap();
    second.submit(None).await.unwrap();
    assert!(first.reference().is_done());

    second.wait().await.unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("order.txt")).unwrap(),
        "first\nsecond\n"
    );
}

#[tokio::test]
async fn test_local_rejects_raw_id_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::builder("true")
        .path(dir.path())
        .options(JobOptions::new().depends_on(4521u64))
        .build(local(1))
        .unwrap();

    let err = job.submit(None).await.unwrap_err();
    assert!(matches!(err, SchedError::LocalDependency(id) if id == "4521"));
    assert!(!job.is_submitted());
}

#[tokio::test]
async fn test_submit_file_and_clean_dir() {
    let dir = tempfile::tempdir().unwrap();
    let backend = local(1);

    let script = make_job_file(
        backend.clone(),
        Job::builder("echo from-file").name("scripted").path(dir.path()),
    )
    .await
    .unwrap();
    assert!(script.ends_with("scripted.cluster"));

    let submission = submit_file(backend.as_ref(), &script, None, &[], None)
        .await
        .unwrap();
    let outcome = backend.wait(&submission).await.unwrap();
    assert_eq!(outcome.exit_code(), Some(0));

    std::fs::write(dir.path().join("keep.txt"), "").unwrap();
    let deleted = clean_dir(backend.as_ref(), dir.path(), "cluster")
        .await
        .unwrap();
    assert_eq!(
        deleted,
        vec!["scripted.cluster", "scripted.cluster.err", "scripted.cluster.out"]
    );
    assert_eq!(dir_entries(dir.path()), vec!["keep.txt"]);
}

#[tokio::test]
async fn test_submit_file_rejects_raw_ids_locally() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("x.sh");
    std::fs::write(&script, "true\n").unwrap();

    let err = submit_file(
        local(1).as_ref(),
        &script,
        Some("x"),
        &[Dependency::parse("12").unwrap()],
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SchedError::LocalDependency(_)));
}
