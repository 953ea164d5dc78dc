/// Parameter substitution and SQL escaping.
///
/// Literal values never reach generated statement text directly: they are
/// carried as `$name` placeholders and substituted here with proper
/// escaping. Structural names (tables, columns) take the identifier gate in
/// `cleaning::identifier` instead — a quoted literal is not a valid table
/// reference, so the two paths cannot be merged.
use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

lazy_static! {
    static ref PLACEHOLDER_RE: Regex =
        Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder regex is valid");
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParameterError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unsupported parameter type for value: {0}")]
    UnsupportedType(String),
}

/// Escape a string value for use inside a single-quoted SQL literal.
/// Backslashes are doubled before anything else so the later escapes do
/// not compound; quotes and control characters follow.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .replace('\0', "\\0")
}

/// Format a parameter value as a SQL literal suitable for direct insertion.
/// Scalars only; arrays and objects have no literal form here.
pub fn format_parameter(value: &Value) -> Result<String, ParameterError> {
    match value {
        Value::String(s) => Ok(format!("'{}'", escape_string(s))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => Ok(f.to_string()),
                    _ => Err(ParameterError::UnsupportedType(format!(
                        "non-finite float: {}",
                        n
                    ))),
                }
            }
        }
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        Value::Null => Ok("NULL".to_string()),
        other => Err(ParameterError::UnsupportedType(other.to_string())),
    }
}

/// Replace every `$name` placeholder in `statement` with the escaped literal
/// form of the matching parameter value.
pub fn substitute_parameters(
    statement: &str,
    params: &HashMap<String, Value>,
) -> Result<String, ParameterError> {
    let mut failure: Option<ParameterError> = None;

    let substituted = PLACEHOLDER_RE.replace_all(statement, |caps: &Captures| {
        let name = &caps[1];
        match params.get(name) {
            Some(value) => match format_parameter(value) {
                Ok(literal) => literal,
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            },
            None => {
                failure.get_or_insert(ParameterError::MissingParameter(name.to_string()));
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(substituted.into_owned()),
    }
}

/// Single-parameter convenience used by the introspection queries.
pub fn single(name: &str, value: Value) -> HashMap<String, Value> {
    let mut params = HashMap::new();
    params.insert(name.to_string(), value);
    params
}
