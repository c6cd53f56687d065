//! Driver script and payload files of a function job.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::artifact::{Artifact, remove_if_exists};
use crate::error::{SchedError, SchedResult};
use crate::function::registry::RUN_FUNCTION_COMMAND;
use crate::function::{FunctionCall, FunctionResult, Imports};

/// The files that run one packaged function.
///
/// For a driver at `<dir>/<name>_func.sh` the input payload is
/// `<driver>.payload.in` and the result lands in `<driver>.payload.out`.
#[derive(Debug, Clone)]
pub struct FunctionArtifact {
    driver: Artifact,
    payload: Artifact,
    output: PathBuf,
    function: String,
}

impl FunctionArtifact {
    /// Package `call` behind a driver script at `driver`.
    ///
    /// `runner` is the executable holding the function registry; the current
    /// executable when `None`. Nothing is written yet.
    pub fn new(
        driver: impl AsRef<Path>,
        call: &FunctionCall,
        imports: &Imports,
        runner: Option<&Path>,
    ) -> SchedResult<Self> {
        let driver_path = std::path::absolute(driver.as_ref())?;
        let payload_path = with_extension_suffix(&driver_path, ".payload.in");
        let output = with_extension_suffix(&driver_path, ".payload.out");

        let runner = match runner {
            Some(runner) => std::path::absolute(runner)?,
            None => std::env::current_exe()?,
        };

        let text = driver_script(&runner, imports, &payload_path, &output);
        let payload = serde_json::to_vec_pretty(&call.payload())?;

        Ok(Self {
            driver: Artifact::script(&driver_path, text)?,
            payload: Artifact::binary(&payload_path, payload)?,
            output,
            function: call.path().to_string(),
        })
    }

    /// The driver script.
    pub fn driver(&self) -> &Artifact {
        &self.driver
    }

    /// The serialized call.
    pub fn payload(&self) -> &Artifact {
        &self.payload
    }

    /// Where the runner writes the result.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Whether the driver was written by us.
    pub fn is_written(&self) -> bool {
        self.driver.is_written()
    }

    /// Write the payload, then the driver script.
    pub async fn write(&mut self, overwrite: bool) -> SchedResult<Option<PathBuf>> {
        self.payload.write(overwrite).await?;
        self.driver.write(overwrite).await
    }

    /// Remove the payloads and the driver script.
    ///
    /// The output payload is removed whenever either input file was
    /// written by us.
    pub async fn clean(&mut self) -> SchedResult<()> {
        if self.payload.is_written() || self.driver.is_written() {
            remove_if_exists(&self.output).await?;
        }
        self.payload.clean().await?;
        self.driver.clean().await
    }

    /// Read the result written by the runner.
    pub async fn read_result(&self) -> SchedResult<serde_json::Value> {
        let raw = fs::read(&self.output).await?;
        match serde_json::from_slice(&raw)? {
            FunctionResult::Ok { value } => Ok(value),
            FunctionResult::Err { message } => Err(SchedError::FunctionFailed {
                function: self.function.clone(),
                message,
            }),
        }
    }
}

/// `<path><suffix>`, keeping the existing extension.
fn with_extension_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn driver_script(runner: &Path, imports: &Imports, payload: &Path, output: &Path) -> String {
    let mut script = String::from("#!/bin/bash\n");
    for line in imports.lines() {
        script.push_str(&line);
        script.push('\n');
    }
    script.push('\n');
    if let Some(dir) = runner.parent() {
        script.push_str(&format!("export PATH=\"{}:$PATH\"\n", dir.display()));
    }
    script.push_str(&format!(
        "exec {} {RUN_FUNCTION_COMMAND} {} {}\n",
        runner.display(),
        payload.display(),
        output.display()
    ));
    script
}
