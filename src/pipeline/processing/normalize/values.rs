use serde_json::Value;

/// Single absence predicate shared by conflict resolution and the formatters.
///
/// A value is absent when it is null, blank after string coercion, or matches
/// one of the configured missing-value sentinels (case-insensitive).
pub fn is_absent(value: &Value, sentinels: &[String]) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.is_empty() || sentinels.iter().any(|m| m.eq_ignore_ascii_case(trimmed))
        }
        Value::Number(n) => n.as_f64().map(|f| !f.is_finite()).unwrap_or(false),
        _ => false,
    }
}

/// String form of a scalar, as the record carried it.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric coercion that yields `None` instead of failing.
pub fn to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Integer coercion; accepts whole floats such as `"5.0"` from tabular sources.
pub fn to_i64(value: &Value) -> Option<i64> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    to_f64(value)
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
        .map(|f| f as i64)
}

/// Short description of a JSON value's type for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
