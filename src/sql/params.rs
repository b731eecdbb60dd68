//! Convert serde_json::Value to the text form bound into casted placeholders (`$n::type`).

use serde_json::Value;

/// Text representation PostgreSQL can cast to the column type. `None` binds NULL.
pub fn bind_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}
