use serde_json::Value;

/// Renders a widget value as editor text.
///
/// Strings are returned as-is, numbers as their decimal text and `null` as the empty
/// string. Everything else (booleans, arrays, objects) becomes compact JSON so that
/// structured parameters are never flattened into something that cannot be parsed back.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        // Integral floats print without a trailing ".0" (e.g. a cfg of 8.0 reads "8").
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}
