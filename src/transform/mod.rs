//! Row Transformers
//!
//! Each pipeline has its own transformer that turns a [`Table`](crate::source::Table)
//! into vertex and edge records. Shared cell helpers live here.

pub mod asset;
pub mod instrument;

use crate::records::Value;

/// Render a non-null scalar as text. Booleans and numbers keep their
/// natural textual form.
pub(crate) fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
    }
}

/// Remove every double-quote character from a string, leaving all other
/// characters untouched. Values without quotes pass through unchanged.
pub fn strip_double_quotes(value: Option<String>) -> Option<String> {
    match value {
        Some(s) if s.contains('"') => Some(s.replace('"', "")),
        other => other,
    }
}
