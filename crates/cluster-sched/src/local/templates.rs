//! Local job script template.

use crate::script::{ScriptSpec, command_block};

/// Generate the shell wrapper run by the worker pool.
pub fn generate_local_script(spec: &ScriptSpec<'_>) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/bash\n\n");
    script.push_str(&command_block(spec));
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{DEFAULT_SUFFIX, Resources};
    use std::path::Path;

    #[test]
    fn test_generate_local_script() {
        let resources = Resources {
            modules: vec!["python/3.11".to_string()],
            time: Some("01:00:00".to_string()),
            ..Default::default()
        };
        let spec = ScriptSpec {
            name: "count",
            command: "wc -l input.txt",
            dir: Path::new("/data"),
            suffix: DEFAULT_SUFFIX,
            resources: &resources,
        };

        let script = generate_local_script(&spec);
        assert!(script.starts_with("#!/bin/bash\n\nmodule load python/3.11\ncd /data\n"));
        assert!(script.contains("echo \"Running count\"\nwc -l input.txt\n"));
        assert!(script.ends_with("fi\n"));
        // Batch-only resources never show up locally.
        assert!(!script.contains("01:00:00"));
        assert!(!script.contains("#SBATCH"));
    }
}
