//! SLURM batch script templates.

use std::path::Path;

use crate::script::{ScriptSpec, command_block};

/// Generate the `.sbatch` submission script.
///
/// It only carries directives and hands the payload to `srun`.
pub fn generate_batch_script(spec: &ScriptSpec<'_>, exec_script: &Path) -> String {
    let resources = spec.resources;
    let mut script = String::new();

    script.push_str("#!/bin/bash\n");
    script.push_str(&format!("#SBATCH --job-name={}\n", sanitize_name(spec.name)));
    if let Some(ref partition) = resources.partition {
        script.push_str(&format!("#SBATCH -p {partition}\n"));
    }
    script.push_str("#SBATCH --ntasks 1\n");
    script.push_str(&format!("#SBATCH --cpus-per-task {}\n", resources.cores));
    if let Some(ref time) = resources.time {
        script.push_str(&format!("#SBATCH --time={time}\n"));
    }
    if let Some(mem) = resources.mem {
        script.push_str(&format!("#SBATCH --mem={mem}\n"));
    }
    script.push_str(&format!("#SBATCH -o {}\n", spec.outfile().display()));
    script.push_str(&format!("#SBATCH -e {}\n", spec.errfile().display()));
    script.push_str(&format!("cd {}\n", spec.dir.display()));
    script.push_str(&format!("srun bash {}\n", exec_script.display()));

    script
}

/// Generate the `.script` file that `srun` executes once.
pub fn generate_exec_script(spec: &ScriptSpec<'_>) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/bash\n");
    script.push_str("mkdir -p $LOCAL_SCRATCH\n");
    script.push_str(&command_block(spec));
    script
}

/// Sanitize a job name for SLURM.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(64) // SLURM has a 64 character limit for job names
        .collect()
}
