//! Environment setup lines for function driver scripts.

use std::collections::BTreeSet;

/// Environment the driver script sets up before running the function.
///
/// Entries containing whitespace are shell statements and pass through
/// as-is (`export OMP_NUM_THREADS=4`, `source venv/bin/activate`). Bare
/// names are environment modules and become `module load <root>`, where a
/// dotted name is reduced to its root (`numpy.linalg` loads `numpy`).
/// Versioned modules (`gcc/12.2`) are loaded exactly as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    entries: Vec<String>,
}

impl Imports {
    /// No setup at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn with(mut self, entry: impl Into<String>) -> Self {
        self.entries.push(entry.into());
        self
    }

    /// Everything currently loaded through environment modules.
    ///
    /// Reads `LOADEDMODULES` (`gcc/12.2:openmpi/4.1`) and drops versions.
    pub fn from_loaded_modules() -> Self {
        std::env::var("LOADEDMODULES")
            .map(|loaded| Self::from_module_list(&loaded))
            .unwrap_or_default()
    }

    fn from_module_list(loaded: &str) -> Self {
        loaded
            .split(':')
            .filter_map(|module| module.split('/').next())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Whether no entries were given.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Script lines, deduplicated and sorted.
    pub fn lines(&self) -> Vec<String> {
        let lines: BTreeSet<String> = self
            .entries
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                if entry.contains(char::is_whitespace) {
                    entry.to_string()
                } else if entry.contains('/') {
                    // versioned module, e.g. gcc/12.2
                    format!("module load {entry}")
                } else {
                    let root = entry.split('.').next().unwrap_or(entry);
                    format!("module load {root}")
                }
            })
            .collect();
        lines.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Imports {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}
