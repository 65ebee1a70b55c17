use crate::error::ConfigError;
use serde_json::{Map, Number, Value};

/// Ordered mapping from variable name to value
pub type EnvMap = Map<String, Value>;

/// Builds a JSON number from a float, keeping integral values as integers
///
/// Returns None for NaN and infinities since JSON cannot carry them.
pub fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        // -0.0 collapses to 0 here
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

/// String form used when mirroring a value into the process environment
pub fn to_env_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Truthiness of a value: null, false, zero and the empty string are falsy
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Converts a JSON object into an environment mapping
pub fn env_map(value: Value) -> Result<EnvMap, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::NotAnObject {
            what: kind_name(&other).to_string(),
        }),
    }
}

/// Short name of a value's kind, used in messages
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
