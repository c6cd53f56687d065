//! Packaging a function call as a job.
//!
//! A function job runs a registered Rust function in a separate process.
//! The call is serialized to a JSON payload next to a small driver script;
//! the driver execs a runner binary (by default the current executable),
//! which looks the function up in its [`FunctionRegistry`], invokes it, and
//! writes the result to a second payload file.
//!
//! Functions are identified by their fully qualified path, taken from
//! [`std::any::type_name`]. Only named `fn` items have a stable path, so
//! closures and function pointers are rejected.

mod artifact;
mod imports;
mod registry;

use std::any::type_name;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SchedError, SchedResult};

pub use artifact::FunctionArtifact;
pub use imports::Imports;
pub use registry::{FunctionRegistry, RUN_FUNCTION_COMMAND};

/// Arguments passed to a packaged function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionArgs {
    /// Positional arguments, in order.
    #[serde(default)]
    pub positional: Vec<Value>,
    /// Keyword arguments.
    #[serde(default)]
    pub keyword: Map<String, Value>,
}

impl FunctionArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Positional argument `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Keyword argument `name`.
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    /// Whether there are no arguments at all.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl From<Vec<Value>> for FunctionArgs {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keyword: Map::new(),
        }
    }
}

/// A function handle plus its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    path: String,
    args: FunctionArgs,
}

impl FunctionCall {
    /// Package `function` with `args`.
    ///
    /// `function` must be a named `fn` item, e.g. `tasks::count_words`.
    pub fn new<F>(_function: F, args: FunctionArgs) -> SchedResult<Self>
    where
        F: Fn(FunctionArgs) -> SchedResult<Value>,
    {
        Ok(Self {
            path: function_path::<F>()?,
            args,
        })
    }

    /// Fully qualified path of the function.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of the module defining the function.
    pub fn module(&self) -> &str {
        self.path
            .rsplit_once("::")
            .map(|(module, _)| module)
            .unwrap_or_default()
    }

    /// Bare function name, the last path segment.
    pub fn name(&self) -> &str {
        self.path
            .rsplit_once("::")
            .map(|(_, name)| name)
            .unwrap_or(&self.path)
    }

    /// The call arguments.
    pub fn args(&self) -> &FunctionArgs {
        &self.args
    }

    /// Mutable access to the call arguments.
    pub fn args_mut(&mut self) -> &mut FunctionArgs {
        &mut self.args
    }

    /// The serialized form written to the input payload.
    pub fn payload(&self) -> FunctionPayload {
        FunctionPayload {
            function: self.path.clone(),
            module: self.module().to_string(),
            args: self.args.clone(),
        }
    }
}

/// Input payload read by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPayload {
    /// Fully qualified function path.
    pub function: String,
    /// Defining module.
    pub module: String,
    /// Call arguments.
    pub args: FunctionArgs,
}

/// Output payload written by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FunctionResult {
    /// The function returned a value.
    Ok { value: Value },
    /// The function (or the lookup) failed.
    Err { message: String },
}

/// Qualified path of a function type, if it has one.
pub(crate) fn function_path<F>() -> SchedResult<String> {
    let path = type_name::<F>();
    if path.contains("{{closure}}") || path.starts_with("fn(") || !path.contains("::") {
        return Err(SchedError::FunctionNotIntrospectable(path.to_string()));
    }
    Ok(path.to_string())
}
