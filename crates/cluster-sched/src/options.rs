//! Job options.
//!
//! Options reach a job either typed (`with_*` builders, serde) or as
//! string key/value pairs from a command line or config file. Both paths
//! accept exactly the names in [`OPTION_NAMES`].

use serde::{Deserialize, Deserializer};

use crate::dependency::Dependency;
use crate::error::{SchedError, SchedResult};
use crate::script::{DEFAULT_SUFFIX, Resources};

/// Every option a job accepts.
pub const OPTION_NAMES: &[&str] = &[
    "threads",
    "cores",
    "time",
    "mem",
    "partition",
    "modules",
    "dependencies",
    "suffix",
    "imports",
];

/// Options for building a job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobOptions {
    /// Local worker pool size, used when the pool is created.
    pub threads: Option<usize>,

    /// Cores to request. Defaults to 1.
    pub cores: Option<u32>,

    /// Walltime as `HH:MM:SS` (batch backends).
    pub time: Option<String>,

    /// Memory in MB (batch backends).
    pub mem: Option<u64>,

    /// Partition or queue (batch backends).
    pub partition: Option<String>,

    /// Environment modules to load before the command.
    #[serde(deserialize_with = "one_or_many")]
    pub modules: Vec<String>,

    /// Jobs or batch ids that must finish first.
    #[serde(deserialize_with = "one_or_many")]
    pub dependencies: Vec<Dependency>,

    /// Suffix of generated file names, `cluster` by default.
    pub suffix: Option<String>,

    /// Setup lines for function driver scripts.
    #[serde(deserialize_with = "one_or_many")]
    pub imports: Vec<String>,
}

impl JobOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from string pairs, failing on the first unknown name.
    pub fn from_pairs<I, K, V>(pairs: I) -> SchedResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::new();
        for (key, value) in pairs {
            options.set(key.as_ref(), value.as_ref())?;
        }
        Ok(options)
    }

    /// Set one option from its string form.
    ///
    /// List options (`modules`, `dependencies`) take comma or whitespace
    /// separated values and extend what is already set.
    pub fn set(&mut self, key: &str, value: &str) -> SchedResult<()> {
        let value = value.trim();
        match key {
            "threads" => self.threads = Some(parse_number(key, value)?),
            "cores" => self.cores = Some(parse_number(key, value)?),
            "time" => self.time = Some(value.to_string()),
            "mem" => self.mem = Some(parse_number(key, value)?),
            "partition" => self.partition = Some(value.to_string()),
            "modules" => self.modules.extend(
                value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|m| !m.is_empty())
                    .map(str::to_string),
            ),
            "dependencies" => self.dependencies.extend(Dependency::parse_list(value)?),
            "suffix" => self.suffix = Some(value.to_string()),
            "imports" => self.imports.push(value.to_string()),
            other => return Err(SchedError::UnrecognizedOption(other.to_string())),
        }
        self.validate()
    }

    /// Check values that the type alone does not constrain.
    pub fn validate(&self) -> SchedResult<()> {
        if self.cores == Some(0) {
            return Err(invalid("cores", "0"));
        }
        if self.threads == Some(0) {
            return Err(invalid("threads", "0"));
        }
        if let Some(ref suffix) = self.suffix {
            if suffix.is_empty() || suffix.contains('/') {
                return Err(invalid("suffix", suffix));
            }
        }
        Ok(())
    }

    /// Set the local pool size.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set the core count.
    pub fn with_cores(mut self, cores: u32) -> Self {
        self.cores = Some(cores);
        self
    }

    /// Set the walltime.
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Set the memory request in MB.
    pub fn with_mem(mut self, mem: u64) -> Self {
        self.mem = Some(mem);
        self
    }

    /// Set the partition or queue.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Add an environment module.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.push(module.into());
        self
    }

    /// Add a driver setup line.
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// Set the file name suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Add a dependency.
    pub fn depends_on(mut self, dependency: impl Into<Dependency>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Add several dependencies.
    pub fn depends_on_all<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// The file name suffix in effect.
    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX)
    }

    /// Resource requests for the script templates.
    pub fn resources(&self) -> Resources {
        Resources {
            cores: self.cores.unwrap_or(1),
            time: self.time.clone(),
            mem: self.mem,
            partition: self.partition.clone(),
            modules: self.modules.clone(),
        }
    }
}

fn invalid(option: &str, value: &str) -> SchedError {
    SchedError::InvalidOption {
        option: option.to_string(),
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(option: &str, value: &str) -> SchedResult<T> {
    value.parse().map_err(|_| invalid(option, value))
}

/// Accept a single value where a list is expected.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_known_options() {
        let options = JobOptions::from_pairs([
            ("cores", "8"),
            ("mem", "16000"),
            ("time", "04:00:00"),
            ("partition", "bigmem"),
            ("modules", "samtools,bwa"),
            ("dependencies", "101 102"),
            ("suffix", "run1"),
        ])
        .unwrap();

        let resources = options.resources();
        assert_eq!(resources.cores, 8);
        assert_eq!(resources.mem, Some(16000));
        assert_eq!(resources.time.as_deref(), Some("04:00:00"));
        assert_eq!(resources.partition.as_deref(), Some("bigmem"));
        assert_eq!(resources.modules, vec!["samtools", "bwa"]);
        assert_eq!(options.dependencies.len(), 2);
        assert_eq!(options.suffix(), "run1");
    }

    #[test]
    fn test_unknown_option_is_named() {
        let err = JobOptions::from_pairs([("cores", "2"), ("bogus_option", "1")]).unwrap_err();
        assert!(matches!(err, SchedError::UnrecognizedOption(name) if name == "bogus_option"));
    }

    #[test]
    fn test_invalid_values() {
        let mut options = JobOptions::new();
        assert!(matches!(
            options.set("mem", "lots"),
            Err(SchedError::InvalidOption { option, value }) if option == "mem" && value == "lots"
        ));
        assert!(options.set("cores", "0").is_err());
        assert!(matches!(
            JobOptions::new().set("dependencies", "soon"),
            Err(SchedError::InvalidDependency(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let options = JobOptions::new();
        assert_eq!(options.suffix(), "cluster");
        assert_eq!(options.resources(), Resources::default());
    }

    #[test]
    fn test_deserialize_options() {
        let options: JobOptions = serde_json::from_str(
            r#"{"cores": 4, "modules": "gcc", "dependencies": [101, "102"]}"#,
        )
        .unwrap();
        assert_eq!(options.cores, Some(4));
        assert_eq!(options.modules, vec!["gcc"]);
        assert_eq!(options.dependencies.len(), 2);

        let options: JobOptions = serde_json::from_str(r#"{"dependencies": 7}"#).unwrap();
        assert_eq!(options.dependencies[0].to_string(), "7");
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let err = serde_json::from_str::<JobOptions>(r#"{"walltime": "01:00:00"}"#).unwrap_err();
        assert!(err.to_string().contains("walltime"));
    }

    #[test]
    fn test_builders() {
        let options = JobOptions::new()
            .with_cores(2)
            .with_mem(500)
            .with_module("python")
            .depends_on(42u64)
            .depends_on_all([43u64, 44]);
        assert_eq!(options.resources().cores, 2);
        assert_eq!(options.dependencies.len(), 3);
        assert!(options.validate().is_ok());
    }
}
