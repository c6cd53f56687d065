//! Torque batch script template.

use crate::script::{ScriptSpec, command_block};

/// Generate the `.qsub` script: directives followed by the payload.
pub fn generate_batch_script(spec: &ScriptSpec<'_>) -> String {
    let resources = spec.resources;
    let mut script = String::new();

    script.push_str("#!/bin/bash\n");
    script.push_str(&format!("#PBS -N {}\n", sanitize_name(spec.name)));
    if let Some(ref queue) = resources.partition {
        script.push_str(&format!("#PBS -q {queue}\n"));
    }
    script.push_str(&format!("#PBS -l nodes=1:ppn={}\n", resources.cores));
    if let Some(ref walltime) = resources.time {
        script.push_str(&format!("#PBS -l walltime={walltime}\n"));
    }
    if let Some(mem) = resources.mem {
        script.push_str(&format!("#PBS -l mem={mem}MB\n"));
    }
    script.push_str(&format!("#PBS -o {}\n", spec.outfile().display()));
    script.push_str(&format!("#PBS -e {}\n", spec.errfile().display()));
    script.push('\n');
    script.push_str("mkdir -p $LOCAL_SCRATCH\n");
    script.push_str(&command_block(spec));

    script
}

/// Sanitize a job name for PBS.
fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(15) // Torque truncates job names at 15 characters
        .collect();

    // PBS job names must start with a letter
    if sanitized
        .chars()
        .next()
        .is_some_and(|c| !c.is_ascii_alphabetic())
    {
        sanitized.insert(0, 'J');
        sanitized.truncate(15);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Resources;
    use std::path::Path;

    #[test]
    fn test_generate_batch_script() {
        let resources = Resources {
            cores: 4,
            time: Some("12:00:00".to_string()),
            mem: Some(8000),
            partition: Some("long".to_string()),
            modules: vec!["bowtie2".to_string()],
        };
        let spec = ScriptSpec {
            name: "map_reads",
            command: "bowtie2 -x idx -U reads.fq",
            dir: Path::new("/home/user/run"),
            suffix: "cluster",
            resources: &resources,
        };
        let script = generate_batch_script(&spec);

        assert!(script.starts_with("#!/bin/bash\n#PBS -N map_reads\n"));
        assert!(script.contains("#PBS -q long\n"));
        assert!(script.contains("#PBS -l nodes=1:ppn=4\n"));
        assert!(script.contains("#PBS -l walltime=12:00:00\n"));
        assert!(script.contains("#PBS -l mem=8000MB\n"));
        assert!(script.contains("#PBS -o /home/user/run/map_reads.cluster.out\n"));
        assert!(script.contains(
            "#PBS -e /home/user/run/map_reads.cluster.err\n\nmkdir -p $LOCAL_SCRATCH\nmodule load bowtie2\n"
        ));
        assert!(script.contains("bowtie2 -x idx -U reads.fq\n"));
        assert!(script.contains("echo Done\n"));
    }

    #[test]
    fn test_unset_resources_are_omitted() {
        let resources = Resources::default();
        let spec = ScriptSpec {
            name: "x",
            command: "true",
            dir: Path::new("/tmp"),
            suffix: "cluster",
            resources: &resources,
        };
        let script = generate_batch_script(&spec);

        assert!(script.contains("#PBS -l nodes=1:ppn=1\n"));
        assert!(!script.contains("#PBS -q"));
        assert!(!script.contains("walltime"));
        assert!(!script.contains("mem="));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my_job"), "my_job");
        assert_eq!(sanitize_name("my job"), "my_job");
        assert_eq!(sanitize_name("123job"), "J123job");
        assert_eq!(sanitize_name(&"a".repeat(30)).len(), 15);
    }
}
