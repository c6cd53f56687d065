//! Function lookup on the runner side.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{SchedError, SchedResult};
use crate::function::{FunctionArgs, FunctionPayload, FunctionResult, function_path};

/// Hidden argument that turns a binary into a function runner.
pub const RUN_FUNCTION_COMMAND: &str = "__cluster-run-function";

type BoxedFunction = Box<dyn Fn(FunctionArgs) -> SchedResult<Value> + Send + Sync>;

/// Functions a runner binary can execute, keyed by qualified path.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, BoxedFunction>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named `fn` item under its qualified path.
    pub fn register<F>(&mut self, function: F) -> SchedResult<&mut Self>
    where
        F: Fn(FunctionArgs) -> SchedResult<Value> + Send + Sync + 'static,
    {
        let path = function_path::<F>()?;
        tracing::debug!(function = %path, "Registered function");
        self.functions.insert(path, Box::new(function));
        Ok(self)
    }

    /// Whether `path` is registered.
    pub fn contains(&self, path: &str) -> bool {
        self.functions.contains_key(path)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Invoke the function a payload names.
    pub fn call(&self, payload: FunctionPayload) -> SchedResult<Value> {
        let function = self
            .functions
            .get(&payload.function)
            .ok_or_else(|| SchedError::UnknownFunction(payload.function.clone()))?;
        function(payload.args)
    }

    /// Run the payload at `input` and write the result to `output`.
    ///
    /// The result file is written for failures too; the error is also
    /// returned so the runner exits non-zero.
    pub fn run_payload(&self, input: &Path, output: &Path) -> SchedResult<()> {
        let payload: FunctionPayload = serde_json::from_slice(&std::fs::read(input)?)?;
        let function = payload.function.clone();
        tracing::info!(function = %function, module = %payload.module, "Running function");

        let (result, outcome) = match self.call(payload) {
            Ok(value) => (FunctionResult::Ok { value }, Ok(())),
            Err(e) => (
                FunctionResult::Err {
                    message: e.to_string(),
                },
                Err(SchedError::FunctionFailed {
                    function,
                    message: e.to_string(),
                }),
            ),
        };

        std::fs::write(output, serde_json::to_vec(&result)?)?;
        outcome
    }

    /// Handle `<exe> __cluster-run-function <input> <output>`.
    ///
    /// Returns `None` when the arguments are not a runner invocation, so the
    /// binary can carry on with its normal command line.
    pub fn dispatch_from_args<I>(&self, args: I) -> Option<SchedResult<()>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter().skip(1);
        if args.next().as_deref() != Some(RUN_FUNCTION_COMMAND) {
            return None;
        }

        Some(match (args.next(), args.next()) {
            (Some(input), Some(output)) => self.run_payload(Path::new(&input), Path::new(&output)),
            _ => Err(SchedError::ConfigError(format!(
                "usage: {RUN_FUNCTION_COMMAND} <payload.in> <payload.out>"
            ))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionCall;
    use serde_json::json;

    fn add(args: FunctionArgs) -> SchedResult<Value> {
        let sum: i64 = args.positional.iter().filter_map(Value::as_i64).sum();
        Ok(json!(sum))
    }

    fn always_fails(_args: FunctionArgs) -> SchedResult<Value> {
        Err(SchedError::ConfigError("no reference genome".to_string()))
    }

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register(add).unwrap().register(always_fails).unwrap();
        registry
    }

    fn write_payload(dir: &Path, call: &FunctionCall) -> std::path::PathBuf {
        let input = dir.join("job_func.sh.payload.in");
        std::fs::write(&input, serde_json::to_vec(&call.payload()).unwrap()).unwrap();
        input
    }

    #[test]
    fn test_register_and_call() {
        let registry = registry();
        assert_eq!(registry.len(), 2);

        let call = FunctionCall::new(add, FunctionArgs::from(vec![json!(2), json!(40)])).unwrap();
        assert!(registry.contains(call.path()));
        assert_eq!(registry.call(call.payload()).unwrap(), json!(42));
    }

    #[test]
    fn test_closure_cannot_be_registered() {
        let mut registry = FunctionRegistry::new();
        assert!(registry.register(|_args: FunctionArgs| Ok(json!(null))).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_function() {
        let payload = FunctionPayload {
            function: "other_crate::tasks::missing".to_string(),
            module: "other_crate::tasks".to_string(),
            args: FunctionArgs::new(),
        };
        assert!(matches!(
            registry().call(payload),
            Err(SchedError::UnknownFunction(name)) if name == "other_crate::tasks::missing"
        ));
    }

    #[test]
    fn test_run_payload_writes_result() {
        let dir = tempfile::tempdir().unwrap();
        let call = FunctionCall::new(add, FunctionArgs::from(vec![json!(1), json!(2)])).unwrap();
        let input = write_payload(dir.path(), &call);
        let output = dir.path().join("job_func.sh.payload.out");

        registry().run_payload(&input, &output).unwrap();
        let result: FunctionResult =
            serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(result, FunctionResult::Ok { value: json!(3) });
    }

    #[test]
    fn test_run_payload_records_failure() {
        let dir = tempfile::tempdir().unwrap();
        let call = FunctionCall::new(always_fails, FunctionArgs::new()).unwrap();
        let input = write_payload(dir.path(), &call);
        let output = dir.path().join("job_func.sh.payload.out");

        let err = registry().run_payload(&input, &output).unwrap_err();
        assert!(matches!(err, SchedError::FunctionFailed { .. }));

        let result: FunctionResult =
            serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
        assert!(
            matches!(result, FunctionResult::Err { message } if message.contains("no reference genome"))
        );
    }

    #[test]
    fn test_dispatch_from_args() {
        let registry = registry();
        let normal = vec!["cluster-demo".to_string(), "submit".to_string()];
        assert!(registry.dispatch_from_args(normal).is_none());

        let incomplete = vec![
            "cluster-demo".to_string(),
            RUN_FUNCTION_COMMAND.to_string(),
            "in".to_string(),
        ];
        assert!(matches!(
            registry.dispatch_from_args(incomplete),
            Some(Err(SchedError::ConfigError(_)))
        ));
    }
}
