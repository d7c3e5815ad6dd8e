//! Parameter extraction helpers shared by the builtin tools

use serde_json::Value;

use super::ToolError;

/// A required string parameter; missing, non-string or blank values are rejected
pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match params.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ToolError::missing(key)),
    }
}

/// A required string parameter where the empty string is meaningful
pub fn present_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::missing(key))
}

/// An optional string parameter; blank strings count as absent
pub fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// An optional positive integer, accepted as a JSON number or numeric string
pub fn optional_positive(params: &Value, key: &str) -> Result<Option<u64>, ToolError> {
    let parsed = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(n) if n > 0 => Ok(Some(n as u64)),
        _ => Err(ToolError::InvalidArgument(format!("{} must be a positive integer", key))),
    }
}

/// An identifier given either as a string or an integer
pub fn required_id(params: &Value, key: &str) -> Result<String, ToolError> {
    match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ToolError::missing(key)),
    }
}
