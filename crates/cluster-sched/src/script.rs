//! Shared pieces of the generated job scripts.
//!
//! Every backend wraps the user's command in the same pre/post blocks; the
//! backend templates only differ in their directives and in how the command
//! block is split across files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default suffix inserted into every generated file name.
pub const DEFAULT_SUFFIX: &str = "cluster";

/// Resource requests for a job.
///
/// Unset fields are left out of the generated directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Cores (slurm: cpus-per-task, torque: ppn).
    pub cores: u32,

    /// Walltime as `HH:MM:SS`.
    pub time: Option<String>,

    /// Memory in MB.
    pub mem: Option<u64>,

    /// Partition (slurm) or queue (torque).
    pub partition: Option<String>,

    /// Environment modules loaded before the command.
    pub modules: Vec<String>,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            cores: 1,
            time: None,
            mem: None,
            partition: None,
            modules: Vec::new(),
        }
    }
}

/// Everything a backend template needs to render a job.
#[derive(Debug, Clone, Copy)]
pub struct ScriptSpec<'a> {
    /// Job name, used in file names and the banner.
    pub name: &'a str,
    /// The full command line to execute.
    pub command: &'a str,
    /// Absolute working directory of the job.
    pub dir: &'a Path,
    /// File name suffix, `cluster` by default.
    pub suffix: &'a str,
    /// Resource requests.
    pub resources: &'a Resources,
}

impl ScriptSpec<'_> {
    /// `<dir>/<name>.<suffix>[.<ext>]`
    pub fn file(&self, ext: Option<&str>) -> PathBuf {
        job_file(self.dir, self.name, self.suffix, ext)
    }

    /// Path of the captured standard output.
    pub fn outfile(&self) -> PathBuf {
        self.file(Some("out"))
    }

    /// Path of the captured standard error.
    pub fn errfile(&self) -> PathBuf {
        self.file(Some("err"))
    }
}

/// A rendered script and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedScript {
    pub path: PathBuf,
    pub text: String,
}

/// Scripts produced by a backend for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSet {
    /// The file handed to the backend's submit path.
    pub submission: RenderedScript,
    /// A separate single-execution script, when the backend needs one.
    pub execution: Option<RenderedScript>,
}

/// Build `<dir>/<name>.<suffix>[.<ext>]`.
pub fn job_file(dir: &Path, name: &str, suffix: &str, ext: Option<&str>) -> PathBuf {
    let file_name = match ext {
        Some(ext) => format!("{name}.{suffix}.{ext}"),
        None => format!("{name}.{suffix}"),
    };
    dir.join(file_name)
}

/// Module loads, directory change, timestamp and banner.
pub fn pre_command(spec: &ScriptSpec<'_>) -> String {
    let mut block = String::new();
    for module in &spec.resources.modules {
        block.push_str(&format!("module load {module}\n"));
    }
    block.push_str(&format!("cd {}\n", spec.dir.display()));
    block.push_str("date +'%d-%H:%M:%S'\n");
    block.push_str(&format!("echo \"Running {}\"\n", spec.name));
    block
}

/// Exit code capture, completion banner and a stderr note on failure.
pub fn post_command() -> String {
    let mut block = String::new();
    block.push_str("exitcode=$?\n");
    block.push_str("echo Done\n");
    block.push_str("date +'%d-%H:%M:%S'\n");
    block.push_str("if [[ $exitcode != 0 ]]; then\n");
    block.push_str("    echo Exited with code: $exitcode >&2\n");
    block.push_str("fi\n");
    block
}

/// Pre block, the command, and post block.
pub fn command_block(spec: &ScriptSpec<'_>) -> String {
    let mut block = pre_command(spec);
    block.push_str(spec.command);
    block.push_str("\n\n");
    block.push_str(&post_command());
    block
}
