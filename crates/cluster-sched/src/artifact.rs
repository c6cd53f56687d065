//! Generated files owned by a job.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::SchedResult;

/// A generated file: its absolute path, its content, and whether we wrote it.
///
/// The path is resolved once at construction, so later changes of the
/// working directory do not move the file.
#[derive(Debug, Clone)]
pub struct Artifact {
    path: PathBuf,
    contents: Vec<u8>,
    written: bool,
}

impl Artifact {
    /// A text script. A trailing newline is added when missing.
    pub fn script(path: impl AsRef<Path>, text: impl Into<String>) -> SchedResult<Self> {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Self::binary(path, text.into_bytes())
    }

    /// A binary payload.
    pub fn binary(path: impl AsRef<Path>, contents: Vec<u8>) -> SchedResult<Self> {
        Ok(Self {
            path: std::path::absolute(path.as_ref())?,
            contents,
            written: false,
        })
    }

    /// Absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The content that will be written.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// The content as text (lossy for binary payloads).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }

    /// Whether this artifact wrote its file.
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Whether the file is on disk right now.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the file.
    ///
    /// Returns the path when the file was written, `None` when `overwrite` is
    /// false and the file already exists.
    pub async fn write(&mut self, overwrite: bool) -> SchedResult<Option<PathBuf>> {
        if !overwrite && self.exists() {
            tracing::debug!(path = %self.path.display(), "Not overwriting existing file");
            return Ok(None);
        }

        fs::write(&self.path, &self.contents).await?;
        self.written = true;
        tracing::debug!(path = %self.path.display(), "Wrote file");
        Ok(Some(self.path.clone()))
    }

    /// Delete the file if we wrote it and it is still there.
    pub async fn clean(&mut self) -> SchedResult<()> {
        if self.written {
            remove_if_exists(&self.path).await?;
        }
        Ok(())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Script<{}(exists: {}; written: {})>",
            self.path.display(),
            self.exists(),
            self.written
        )
    }
}

/// Remove a file, treating "not found" as success.
pub(crate) async fn remove_if_exists(path: &Path) -> SchedResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
