//! Built-in reducers and server templates for scripts

use crate::script::ReducerSpec;
use serde_json::{Map, Value};
use sidefx_types::PropsBag;

/// Reduce the ordered props of every live instance into a JSON state
pub fn reduce(spec: &ReducerSpec, props: &[PropsBag]) -> Value {
    match spec {
        ReducerSpec::Join { key, separator } => Value::String(
            props
                .iter()
                .filter_map(|p| p.get(key).and_then(|v| v.to_text()))
                .collect::<Vec<_>>()
                .join(separator),
        ),
        ReducerSpec::Last { key } => props
            .iter()
            .rev()
            .filter_map(|p| p.get(key))
            .find(|v| !v.is_null())
            .map(|v| Value::from(v.clone()))
            .unwrap_or(Value::Null),
        ReducerSpec::Merge => {
            let mut merged = Map::new();
            for bag in props {
                merged.extend(bag.to_json_map());
            }
            Value::Object(merged)
        }
        ReducerSpec::Collect { key } => Value::Array(
            props
                .iter()
                .filter_map(|p| p.get(key))
                .map(|v| Value::from(v.clone()))
                .collect(),
        ),
    }
}

/// Substitute the state into `template` at every `{state}`
///
/// String states are inserted verbatim, anything else as compact JSON.
pub fn apply_template(template: &str, state: Value) -> Value {
    let text = match &state {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Value::String(template.replace("{state}", &text))
}
