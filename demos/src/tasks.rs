//! Functions this binary can run as jobs.

use cluster_sched::{FunctionArgs, FunctionRegistry, SchedError, SchedResult};
use serde_json::{Map, Value, json};

/// Count lines and words in every file passed as a positional argument.
pub fn count_words(args: FunctionArgs) -> SchedResult<Value> {
    let mut counts = Map::new();
    for arg in &args.positional {
        let path = arg.as_str().ok_or_else(|| SchedError::InvalidOption {
            option: "path".to_string(),
            value: arg.to_string(),
        })?;
        let text = std::fs::read_to_string(path)?;
        counts.insert(
            path.to_string(),
            json!({
                "lines": text.lines().count(),
                "words": text.split_whitespace().count(),
            }),
        );
    }
    Ok(Value::Object(counts))
}

/// Every function the demo submits.
pub fn registry() -> SchedResult<FunctionRegistry> {
    let mut registry = FunctionRegistry::new();
    registry.register(count_words)?;
    Ok(registry)
}
